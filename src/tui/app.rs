use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::theme::Theme;
use crate::app::UIConfig;
use crate::constants::{CRISIS_LINE_DISPLAY, QUICK_SUGGESTIONS, UI_SCROLL_LINES};
use crate::session::{ConversationSession, SendOutcome};

/// Work the event loop has to run off the UI thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Send the current draft
    Send,
    /// Send one of the quick suggestions
    Suggestion(&'static str),
    /// Start a new conversation
    NewConversation,
    Quit,
}

/// Application state
pub struct App {
    /// The conversation being shown
    pub session: ConversationSession,
    /// Is the app running?
    pub running: bool,
    /// Lines scrolled up from the bottom of the chat
    pub scroll_offset: u16,
    pub show_resources: bool,
    pub show_analysis: bool,
    /// Crisis line popup
    pub show_crisis_line: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Backend shown in the header
    pub api_url: String,
    pub theme: Theme,
}

impl App {
    /// Create a new app instance
    pub fn new(session: ConversationSession, ui: &UIConfig, api_url: impl Into<String>) -> Self {
        Self {
            session,
            running: true,
            scroll_offset: 0,
            show_resources: ui.show_resources,
            show_analysis: ui.show_analysis,
            show_crisis_line: false,
            status_message: None,
            api_url: api_url.into(),
            theme: Theme::default(),
        }
    }

    /// Map a key press to local state changes and, when needed, a command
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(UiCommand::Quit),
                KeyCode::Char('n') => {
                    self.scroll_offset = 0;
                    Some(UiCommand::NewConversation)
                }
                KeyCode::Char('l') => {
                    self.session.clear();
                    self.scroll_offset = 0;
                    self.set_status("Chat cleared");
                    None
                }
                KeyCode::Char('r') => {
                    self.show_resources = !self.show_resources;
                    None
                }
                KeyCode::Char('a') => {
                    self.show_analysis = !self.show_analysis;
                    None
                }
                KeyCode::Char('h') => {
                    self.toggle_crisis_line();
                    None
                }
                _ => None,
            };
        }

        match key.code {
            KeyCode::Esc if self.show_crisis_line => {
                self.show_crisis_line = false;
                None
            }
            KeyCode::Esc => Some(UiCommand::Quit),
            KeyCode::Enter => {
                self.scroll_offset = 0;
                Some(UiCommand::Send)
            }
            KeyCode::F(n @ 1..=4) => {
                self.scroll_offset = 0;
                QUICK_SUGGESTIONS
                    .get(usize::from(n) - 1)
                    .map(|s| UiCommand::Suggestion(*s))
            }
            KeyCode::PageUp => {
                self.scroll_up(UI_SCROLL_LINES * 3);
                None
            }
            KeyCode::PageDown => {
                self.scroll_down(UI_SCROLL_LINES * 3);
                None
            }
            KeyCode::Up => {
                self.scroll_up(1);
                None
            }
            KeyCode::Down => {
                self.scroll_down(1);
                None
            }
            KeyCode::Backspace => {
                self.backspace();
                None
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                None
            }
            _ => None,
        }
    }

    /// Append to the draft unless it is already at the limit
    pub fn insert_char(&mut self, c: char) -> bool {
        let mut draft = self.session.draft();
        if draft.chars().count() >= self.session.max_characters() {
            self.set_status(format!(
                "Message limit of {} characters reached",
                self.session.max_characters()
            ));
            return false;
        }
        draft.push(c);
        self.session.set_draft(draft);
        true
    }

    pub fn backspace(&mut self) {
        let mut draft = self.session.draft();
        if draft.pop().is_some() {
            self.session.set_draft(draft);
        }
    }

    /// Reflect a finished send in the status bar
    pub fn apply_outcome(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Busy => self.set_status("Still waiting for a reply"),
            SendOutcome::Failed => self.set_status("Could not reach the support service"),
            SendOutcome::Delivered => {
                if self.session.has_crisis() {
                    self.set_status(format!("You're not alone. {}", CRISIS_LINE_DISPLAY));
                } else {
                    self.clear_status();
                }
            }
            SendOutcome::Ignored => {}
        }
    }

    pub fn toggle_crisis_line(&mut self) {
        self.show_crisis_line = !self.show_crisis_line;
    }

    /// Set status message
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Scroll chat view up; the renderer clamps to the content height
    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(amount);
    }

    /// Scroll chat view down
    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }
}
