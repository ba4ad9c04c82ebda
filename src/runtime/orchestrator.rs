use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    app::{load_config, Config},
    backend::{Gateway, GatewayFactory},
    cli::{handle_command, Cli},
    session::{select_conversation, ConversationSession, SessionConfig, SessionState},
    tui::{run_ui, App},
    utils::log_progress,
};

/// Resolve configuration from files, environment and CLI overrides
///
/// An explicit `--config` that fails to load is fatal; otherwise broken
/// config files fall back to defaults with a warning.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) if cli.config.is_some() => return Err(err),
        Err(err) => {
            eprintln!("Failed to load config: {:#}. Using defaults.", err);
            Config::default()
        }
    };

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
    state: SessionState,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let config = resolve_config(&cli)?;

        let state = SessionState::load().unwrap_or_else(|err| {
            warn!("Ignoring unreadable session state: {:#}", err);
            SessionState::default()
        });

        Ok(Self { cli, config, state })
    }

    /// Run the orchestrator
    pub async fn run(mut self) -> Result<()> {
        if let Some(command) = &self.cli.command {
            if handle_command(command, &self.config).await? {
                return Ok(());
            }
        }

        let api_url = self.config.api.base_url.clone();
        log_progress(1, 3, format!("Connecting to {}", api_url.cyan()));
        if !GatewayFactory::validate(&self.config).await {
            eprintln!("{} backend is not answering its health check", "warning:".yellow());
        }
        let gateway = GatewayFactory::create(&self.config)?;
        let session = ConversationSession::new(
            Arc::clone(&gateway),
            SessionConfig::from(&self.config.chat),
        );

        log_progress(2, 3, "Loading support resources");
        session.initialize().await;

        log_progress(3, 3, "Restoring conversation");
        self.restore_conversation(&session, gateway.as_ref()).await?;

        let persistence = self.spawn_persistence(&session);
        let app = App::new(session.clone(), &self.config.ui, api_url.clone());
        let result = run_ui(app).await;
        persistence.abort();

        if let Some(id) = session.conversation_id() {
            self.state.set_conversation(Some(id), &api_url);
            if let Err(err) = self.state.save() {
                eprintln!("Failed to save session: {:#}", err);
            }
        }

        result
    }

    /// Apply `--continue` / `--resume`
    ///
    /// A conversation that can no longer be loaded is reported and the
    /// session carries on as a new conversation.
    async fn restore_conversation(
        &self,
        session: &ConversationSession,
        gateway: &dyn Gateway,
    ) -> Result<()> {
        let api_url = &self.config.api.base_url;

        let target = if self.cli.continue_conversation {
            let id = self.state.conversation_for(api_url);
            if id.is_none() {
                println!("No previous conversation for {}, starting fresh.", api_url);
            }
            id
        } else if self.cli.resume {
            let conversations = gateway
                .get_conversations()
                .await
                .context("Failed to list conversations")?;
            select_conversation(conversations)?
        } else {
            None
        };

        if let Some(id) = target {
            match session.resume(id).await {
                Ok(()) => info!("Continuing conversation {}", id),
                Err(err) => {
                    eprintln!("Could not load conversation {}: {}", id, err);
                    eprintln!("   Starting a new conversation instead.");
                }
            }
        }
        Ok(())
    }

    /// Save the conversation id whenever the session adopts a new one
    fn spawn_persistence(&self, session: &ConversationSession) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let mut state = self.state.clone();
        let api_url = self.config.api.base_url.clone();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let current = *rx.borrow_and_update();
                let Some(id) = current else { continue };
                state.set_conversation(Some(id), &api_url);
                if let Err(err) = state.save() {
                    warn!("Failed to save session state: {:#}", err);
                }
            }
        })
    }
}
