use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::io;

use crate::models::{Conversation, ConversationId};

/// Show a selection UI for choosing a conversation to resume
pub fn select_conversation(conversations: Vec<Conversation>) -> Result<Option<ConversationId>> {
    if conversations.is_empty() {
        println!("No previous conversations found.");
        return Ok(None);
    }

    if let [only] = conversations.as_slice() {
        return Ok(Some(only.id));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut selector = ConversationSelector::new(conversations);
    let result = run_selector(&mut terminal, &mut selector);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

enum Choice {
    Pending,
    Cancelled,
    Picked(ConversationId),
}

struct ConversationSelector {
    conversations: Vec<Conversation>,
    selected: usize,
}

impl ConversationSelector {
    fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations,
            selected: 0,
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Choice {
        let last = self.conversations.len().saturating_sub(1);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Choice::Cancelled,
            KeyCode::Enter => {
                if let Some(conversation) = self.conversations.get(self.selected) {
                    return Choice::Picked(conversation.id);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.selected = (self.selected + 1).min(last),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = last,
            _ => {}
        }
        Choice::Pending
    }
}

fn run_selector(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    selector: &mut ConversationSelector,
) -> Result<Option<ConversationId>> {
    loop {
        terminal.draw(|f| render_selector(f, selector))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match selector.handle_key(key.code) {
                Choice::Pending => {}
                Choice::Cancelled => return Ok(None),
                Choice::Picked(id) => return Ok(Some(id)),
            }
        }
    }
}

fn render_selector(f: &mut Frame, selector: &ConversationSelector) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    let title = Paragraph::new("Select a conversation to resume")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(" Solace - Resume Conversation "));
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = selector
        .conversations
        .iter()
        .enumerate()
        .map(|(i, conv)| {
            let style = if i == selector.selected {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let count = conv
                .message_count
                .unwrap_or(conv.messages.len() as u64);
            let mut details = format!(
                "  {} | {} messages",
                conv.updated_at.format("%Y-%m-%d %H:%M"),
                count
            );
            if let Some(last) = &conv.last_message {
                let preview: String = last.content.chars().take(48).collect();
                details.push_str(&format!(" | {}", preview));
            }

            ListItem::new(vec![
                Line::from(Span::styled(format!("#{} {}", conv.id, conv.title), style)),
                Line::from(Span::styled(details, style.fg(Color::Gray))),
            ])
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Previous Conversations "),
    );
    f.render_widget(list, chunks[1]);

    let help = Line::from(vec![
        Span::raw("Up/k: Up  Down/j: Down  "),
        Span::styled("Enter", Style::default().fg(Color::Green)),
        Span::raw(": Resume  "),
        Span::styled("q/Esc", Style::default().fg(Color::Red)),
        Span::raw(": Cancel"),
    ]);
    let help_widget = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help_widget, chunks[2]);
}
