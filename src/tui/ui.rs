use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::constants::UI_REFRESH_INTERVAL_MS;
use crate::session::SendOutcome;
use crate::tui::app::{App, UiCommand};
use crate::tui::render::render_ui;

/// Completions reported back by spawned session work
#[derive(Debug)]
enum UiEvent {
    Sent(SendOutcome),
    ConversationStarted,
}

/// Run the terminal UI until the user quits
pub async fn run_ui(mut app: App) -> Result<()> {
    if !crossterm::tty::IsTty::is_tty(&io::stdout()) {
        eprintln!("Solace requires an interactive terminal.");
        eprintln!("   Use --prompt for one-shot use from scripts and pipes.");
        return Err(anyhow::anyhow!("No interactive terminal available"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Let a reply that is still on screen land before the caller saves state
    app.session.settle().await;

    if let Err(err) = &res {
        error!("UI loop failed: {:?}", err);
    }
    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<UiEvent>();

    while app.running {
        terminal.draw(|f| render_ui(f, app))?;

        if event::poll(Duration::from_millis(UI_REFRESH_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(command) = app.handle_key(key) {
                        dispatch(app, command, &tx);
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            debug!("UI event: {:?}", event);
            match event {
                UiEvent::Sent(outcome) => app.apply_outcome(outcome),
                UiEvent::ConversationStarted => app.set_status("Started a new conversation"),
            }
        }
    }

    Ok(())
}

/// Run a command; anything touching the backend goes to its own task
fn dispatch(app: &mut App, command: UiCommand, tx: &mpsc::UnboundedSender<UiEvent>) {
    match command {
        UiCommand::Quit => app.quit(),
        UiCommand::Send => {
            let session = app.session.clone();
            let draft = session.draft();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = session.send(&draft).await;
                let _ = tx.send(UiEvent::Sent(outcome));
            });
        }
        UiCommand::Suggestion(text) => {
            let session = app.session.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = session.send_suggestion(text).await;
                let _ = tx.send(UiEvent::Sent(outcome));
            });
        }
        UiCommand::NewConversation => {
            app.clear_status();
            let session = app.session.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                session.start_new().await;
                let _ = tx.send(UiEvent::ConversationStarted);
            });
        }
    }
}
