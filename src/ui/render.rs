//! Layout and dispatch to the panel widgets.

use crate::app::{App, InputMode, Panel};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::loop_runner::SPINNER_FRAMES;
use super::{chat, news, proxy, status, video};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 12;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(super) fn spinner(app: &App) -> &'static str {
    SPINNER[app.spinner_frame % SPINNER_FRAMES]
}

pub(super) fn scroll_offset(app: &App, panel: Panel) -> u16 {
    u16::try_from(app.scroll[panel.index()]).unwrap_or(u16::MAX)
}

pub(super) fn panel_block<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
}

/// Main render function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_tabs(f, app, chunks[0]);

    match app.panel {
        Panel::News => news::render(f, app, chunks[1]),
        Panel::Chat => chat::render(f, app, chunks[1]),
        Panel::Proxy => proxy::render(f, app, chunks[1]),
        Panel::Video => video::render(f, app, chunks[1]),
    }

    render_input(f, app, chunks[2]);
    status::render(f, app, chunks[3]);
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles = Panel::ALL
        .iter()
        .map(|p| format!("{} {}", p.index() + 1, p.title()));
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("newsdeck"))
        .select(app.panel.index())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

/// Input box for the active panel, or the API key prompt (masked).
fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let (label, text) = match app.mode {
        InputMode::ApiKey => ("API key", "*".repeat(app.key_input.chars().count())),
        _ => (app.panel.input_label(), app.input().to_string()),
    };
    let editing = app.mode != InputMode::Normal;
    let border = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    // Keep the cursor end visible on long input.
    let visible = area.width.saturating_sub(3) as usize;
    let len = text.chars().count();
    let shown: String = text.chars().skip(len.saturating_sub(visible)).collect();
    let cursor_x = area.x + 1 + shown.chars().count() as u16;

    f.render_widget(
        Paragraph::new(shown).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(label),
        ),
        area,
    );

    if editing {
        f.set_cursor_position(Position::new(cursor_x, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::Session;
    use crate::status::Slot;
    use crate::storage::Database;
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::Path;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let session = Session::load(Config::default(), db, reqwest::Client::new(), Path::new("/tmp"))
            .await
            .unwrap();
        App::new(session)
    }

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_render_news_panel() {
        let app = test_app().await;
        let screen = draw(&app, 100, 24);
        assert!(screen.contains("1 News"));
        assert!(screen.contains("News (3 feeds)"));
        assert!(screen.contains("Add RSS feed URL"));
        assert!(screen.contains("[q]uit"));
    }

    #[tokio::test]
    async fn test_render_status_replaces_hints() {
        let mut app = test_app().await;
        app.switch_panel(Panel::Proxy);
        app.session.status.error(Slot::Proxy, "Please enter a URL");
        let screen = draw(&app, 100, 24);
        assert!(screen.contains("Please enter a URL"));
        assert!(!screen.contains("[q]uit"));
    }

    #[tokio::test]
    async fn test_api_key_is_masked() {
        let mut app = test_app().await;
        app.mode = InputMode::ApiKey;
        app.key_input = "secret".into();
        let screen = draw(&app, 100, 24);
        assert!(screen.contains("******"));
        assert!(!screen.contains("secret"));
    }

    #[tokio::test]
    async fn test_small_terminal_message() {
        let app = test_app().await;
        assert!(draw(&app, 40, 10).contains("Terminal too small"));
    }
}
