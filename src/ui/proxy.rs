use crate::app::{App, Panel};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::render::{panel_block, scroll_offset};

/// Render the content fetched through the proxy.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let paragraph = match app.session.proxy_content() {
        Some(content) => Paragraph::new(content.lines().map(Line::from).collect::<Vec<_>>()),
        None => Paragraph::new("Enter a URL to fetch it through the proxy.")
            .style(Style::default().fg(Color::DarkGray)),
    };

    f.render_widget(
        paragraph
            .block(panel_block("Proxy"))
            .wrap(Wrap { trim: false })
            .scroll((scroll_offset(app, Panel::Proxy), 0)),
        area,
    );
}
