use crate::app::{App, Panel};
use crate::llm::Role;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::render::{panel_block, scroll_offset, spinner};

/// Render the chat transcript.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let chat = &app.session.chat;
    let mut lines: Vec<Line<'_>> = Vec::new();

    if chat.transcript().is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask anything. Press i to start typing.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for message in chat.transcript() {
        let (label, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("AI", Color::Green),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(message.content.lines().map(Line::from));
        lines.push(Line::from(""));
    }

    if chat.is_in_flight() {
        lines.push(Line::from(Span::styled(
            format!("{} thinking", spinner(app)),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel_block(format!(
            "Chat ({} messages in context)",
            chat.history().len()
        )))
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset(app, Panel::Chat), 0));
    f.render_widget(paragraph, area);
}
