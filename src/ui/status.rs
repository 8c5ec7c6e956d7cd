use crate::app::{App, InputMode};
use crate::status::Severity;
use crate::util::truncate_to_width;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

fn hints(app: &App) -> &'static str {
    match app.mode {
        InputMode::Normal => {
            "[Tab/1-4]panel [i]nput [a]dd feed [r]efresh [s]ummarize [k]ey [c]lear chat [o]pen video [q]uit"
        }
        InputMode::Editing => "Type, ENTER submit, ESC stop editing",
        InputMode::ApiKey => "Enter API key, ENTER save, ESC cancel",
    }
}

/// Render the status bar: the active panel's status line, or key hints.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let slot = app.panel.slot();
    let (text, style): (Cow<'_, str>, Style) = match app.session.status.current(slot) {
        Some(line) => {
            let fg = match line.severity {
                Severity::Info => Color::White,
                Severity::Success => Color::Green,
                Severity::Error => Color::Red,
            };
            (
                Cow::Owned(line.message),
                Style::default().bg(Color::DarkGray).fg(fg),
            )
        }
        None => (
            Cow::Borrowed(hints(app)),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
    };

    let text = truncate_to_width(&text, area.width as usize);
    f.render_widget(Paragraph::new(text).style(style), area);
}
