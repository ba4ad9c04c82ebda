use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::constants::{CRISIS_LINE_DISPLAY, CRISIS_LINE_URI, QUICK_SUGGESTIONS};
use crate::models::Sender;
use crate::session::ConversationState;
use crate::tui::app::App;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let state = app.session.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Main content
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app, &state);

    let show_side = app.show_resources || app.show_analysis;
    if show_side {
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(chunks[1]);
        render_chat(frame, content[0], app, &state);
        render_side(frame, content[1], app, &state);
    } else {
        render_chat(frame, chunks[1], app, &state);
    }

    render_input(frame, chunks[2], app, &state);
    render_status_bar(frame, chunks[3], app, &state);

    if app.show_crisis_line {
        render_crisis_popup(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let conversation = match state.conversation_id {
        Some(id) => format!("Conversation #{}", id),
        None => "New conversation".to_string(),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            "Solace",
            Style::default()
                .fg(app.theme.header)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(conversation, Style::default().fg(app.theme.success)),
        Span::raw(" | "),
        Span::styled(&app.api_url, Style::default().fg(app.theme.text_secondary)),
    ])];

    if state.has_crisis() {
        lines.push(Line::from(Span::styled(
            format!(" If you are in danger, {} (Ctrl+H) ", CRISIS_LINE_DISPLAY),
            Style::default()
                .bg(app.theme.crisis)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
    }

    let header = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

/// Rows `lines` occupy once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(usize::from(u16::MAX)) as u16
}

fn chat_lines<'a>(app: &App, state: &'a ConversationState) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    for message in &state.messages {
        let label = match message.sender {
            Sender::User => "You",
            Sender::Bot => "Solace",
        };
        let mut header = vec![
            Span::styled(
                format!("[{}] ", label),
                Style::default()
                    .fg(app.theme.sender(message.sender))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                message.timestamp.format("%H:%M").to_string(),
                Style::default().fg(app.theme.text_secondary),
            ),
        ];
        if message.is_crisis_detected {
            header.push(Span::styled(
                "  crisis",
                Style::default().fg(app.theme.crisis),
            ));
        }
        lines.push(Line::from(header));

        for line in message.content.lines() {
            lines.push(Line::from(line));
        }
        lines.push(Line::from(""));
    }

    if state.is_typing {
        lines.push(Line::from(Span::styled(
            "Solace is typing...",
            Style::default()
                .fg(app.theme.bot_message)
                .add_modifier(Modifier::ITALIC | Modifier::SLOW_BLINK),
        )));
    }

    lines
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let mut lines = chat_lines(app, state);

    // Only a fresh conversation shows the suggestions
    if state.messages.len() <= 1 && !state.is_loading {
        lines.push(Line::from(Span::styled(
            "Try one of these:",
            Style::default().fg(app.theme.text_secondary),
        )));
        for (i, suggestion) in QUICK_SUGGESTIONS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  F{} ", i + 1),
                    Style::default()
                        .fg(app.theme.warning)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*suggestion),
            ]));
        }
    }

    let inner_height = area.height.saturating_sub(2);
    let total = wrapped_height(&lines, area.width.saturating_sub(2));
    let max_scroll = total.saturating_sub(inner_height);
    let top = max_scroll.saturating_sub(app.scroll_offset.min(max_scroll));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Chat ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border_focused)),
        )
        .wrap(Wrap { trim: false })
        .scroll((top, 0));

    frame.render_widget(paragraph, area);
}

fn render_side(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    match (app.show_resources, app.show_analysis) {
        (true, true) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(area);
            render_resources(frame, parts[0], app, state);
            render_analysis(frame, parts[1], app, state);
        }
        (true, false) => render_resources(frame, area, app, state),
        (false, true) => render_analysis(frame, area, app, state),
        (false, false) => {}
    }
}

fn render_resources(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let mut items: Vec<ListItem> = Vec::new();

    if state.resources.is_empty() {
        items.push(ListItem::new(Line::from(Span::styled(
            "No resources loaded",
            Style::default().fg(app.theme.text_secondary),
        ))));
    }

    let mut resources: Vec<_> = state.resources.iter().collect();
    resources.sort_by_key(|r| !r.is_crisis_resource);

    for resource in resources {
        let mut title = vec![
            Span::styled(
                format!("[{}] ", resource.resource_type.label()),
                Style::default().fg(app.theme.resource_type(resource.resource_type)),
            ),
            Span::styled(&resource.title, Style::default().add_modifier(Modifier::BOLD)),
        ];
        if resource.is_crisis_resource {
            title.push(Span::styled(" !", Style::default().fg(app.theme.crisis)));
        }

        let mut lines = vec![Line::from(title)];
        if let Some(phone) = &resource.phone_number {
            lines.push(Line::from(Span::styled(
                format!("  {}", phone),
                Style::default().fg(app.theme.warning),
            )));
        }
        if let Some(url) = &resource.url {
            lines.push(Line::from(Span::styled(
                format!("  {}", url),
                Style::default().fg(app.theme.text_secondary),
            )));
        }
        items.push(ListItem::new(lines));
    }

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Resources ({}) ", state.resources.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    frame.render_widget(list, area);
}

fn render_analysis(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let mut lines = Vec::new();

    match &state.last_analysis {
        None => lines.push(Line::from(Span::styled(
            "Nothing analysed yet",
            Style::default().fg(app.theme.text_secondary),
        ))),
        Some(analysis) => {
            lines.push(Line::from(vec![
                Span::raw("Sentiment  "),
                Span::styled(
                    format!(
                        "{:?} ({:+.2})",
                        analysis.sentiment.label, analysis.sentiment.compound
                    ),
                    Style::default().fg(app.theme.sentiment(analysis.sentiment.compound)),
                ),
            ]));
            lines.push(Line::from(format!("Category   {:?}", analysis.category)));
            lines.push(Line::from(vec![
                Span::raw("Severity   "),
                Span::styled(
                    format!("{:?}", analysis.severity),
                    Style::default().fg(app.theme.severity(analysis.severity)),
                ),
            ]));
            lines.push(Line::from(format!(
                "Confidence {:.0}%",
                analysis.confidence * 100.0
            )));
            if !analysis.keywords.is_empty() {
                let keywords: Vec<&str> =
                    analysis.keywords.iter().map(|k| k.keyword.as_str()).collect();
                lines.push(Line::from(format!("Keywords   {}", keywords.join(", "))));
            }
        }
    }

    if !state.recommended_actions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Suggested next steps",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for action in &state.recommended_actions {
            lines.push(Line::from(format!("  • {}", action.replace('_', " "))));
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Analysis ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let max = app.session.max_characters();
    let shown = state.displayed_character_count(max);
    let count_color = if shown >= max {
        app.theme.error
    } else {
        app.theme.text_secondary
    };

    let title = Line::from(vec![
        Span::raw(" Message "),
        Span::styled(
            format!("{}/{} ", shown, max),
            Style::default().fg(count_color),
        ),
    ]);

    let border = if state.is_loading {
        app.theme.border
    } else {
        app.theme.border_focused
    };

    let input = Paragraph::new(state.draft.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    frame.render_widget(input, area);

    let cursor_x = area.x + 1 + state.draft.chars().count() as u16;
    let cursor_x = cursor_x.min(area.x + area.width.saturating_sub(2));
    frame.set_cursor_position((cursor_x, area.y + 1));
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, state: &ConversationState) {
    let (mode, mode_color) = if state.is_loading {
        ("WAIT", app.theme.warning)
    } else {
        ("CHAT", app.theme.success)
    };

    let status_text = if let Some(status) = &app.status_message {
        status.clone()
    } else if state.is_typing {
        "Waiting for a reply...".to_string()
    } else {
        "Ready".to_string()
    };

    let spans = vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default()
                .bg(mode_color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(status_text),
        Span::raw(" | "),
        Span::styled(
            "Ctrl+N new  Ctrl+L clear  Ctrl+R resources  Ctrl+A analysis  Ctrl+H crisis  Esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let status_bar = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::Black))
        .block(Block::default());
    frame.render_widget(status_bar, area);
}

fn render_crisis_popup(frame: &mut Frame, app: &App) {
    let area = centered_rect(frame.area(), 54, 7);
    let lines = vec![
        Line::from(Span::styled(
            "You don't have to go through this alone.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            CRISIS_LINE_DISPLAY,
            Style::default()
                .fg(app.theme.crisis)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            CRISIS_LINE_URI,
            Style::default().fg(app.theme.text_secondary),
        )),
    ];

    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Crisis Support (Esc to close) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.crisis)),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
