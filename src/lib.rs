pub mod app;
pub mod backend;
pub mod cli;
pub mod constants;
pub mod models;
pub mod runtime;
pub mod session;
pub mod tui;
pub mod utils;

pub use app::{load_config, Config};
pub use backend::{Gateway, GatewayFactory};
pub use session::{ConversationSession, SendOutcome};
pub use tui::run_ui;
pub use utils::SolaceError;
