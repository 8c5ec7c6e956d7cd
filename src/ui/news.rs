use crate::app::{App, Panel};
use crate::feed::Article;
use chrono::{DateTime, Local};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::render::{panel_block, scroll_offset, spinner};

/// Format a publication time for an article row.
pub(super) fn format_published(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

fn article_lines(article: &Article) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(5);
    lines.push(Line::from(Span::styled(
        article.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("{} • {}", article.source, format_published(article.published)),
        Style::default().fg(Color::DarkGray),
    )));
    let excerpt = article.excerpt();
    if !excerpt.is_empty() {
        lines.push(Line::from(excerpt));
    }
    lines.push(Line::from(Span::styled(
        article.link.clone(),
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
    )));
    lines.push(Line::from(""));
    lines
}

/// Render the news panel: summary (when present) above the article list.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let feeds = &app.session.feeds;
    let mut lines: Vec<Line<'static>> = Vec::new();

    if let Some(summary) = feeds.summary() {
        lines.push(Line::from(vec![
            Span::styled(
                crate::llm::SUMMARY_TITLE,
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  Generated {}", summary.generated_at.format("%Y-%m-%d %H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.extend(app.summary_lines.iter().cloned());
        lines.push(Line::from(Span::styled(
            "─".repeat(area.width.saturating_sub(2) as usize),
            Style::default().fg(Color::DarkGray),
        )));
    } else if app.summarizing {
        lines.push(Line::from(format!("{} Summarizing...", spinner(app))));
        lines.push(Line::from(""));
    }

    if let Some(error) = feeds.load_error() {
        lines.push(Line::from(Span::styled(
            error,
            Style::default().fg(Color::Red),
        )));
    } else if feeds.articles().is_empty() {
        let placeholder = if app.refreshing {
            format!("{} Loading feeds...", spinner(app))
        } else {
            "No articles. Press r to refresh.".to_string()
        };
        lines.push(Line::from(placeholder));
    } else {
        lines.extend(feeds.articles().iter().flat_map(article_lines));
    }

    let mut title = format!("News ({} feeds)", feeds.sources().len());
    if app.refreshing {
        title.push_str(&format!(" {}", spinner(app)));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel_block(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset(app, Panel::News), 0));
    f.render_widget(paragraph, area);
}
