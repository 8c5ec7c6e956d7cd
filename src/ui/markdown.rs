use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::util::strip_control_chars;

/// Convert summary markdown to styled lines.
///
/// Covers what completion replies actually use: headings, paragraphs,
/// bullet and numbered lists, emphasis, inline code and code blocks.
pub fn render_markdown(md: &str) -> Vec<Line<'static>> {
    let md = strip_control_chars(md);
    let parser = Parser::new(&md);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut current_spans: Vec<Span<'static>> = Vec::with_capacity(4);
    // One entry per open list: next number for ordered lists, None for bullets.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut in_code_block = false;
    let mut in_heading = false;
    let mut in_emphasis = false;
    let mut in_strong = false;

    let flush = |spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !spans.is_empty() {
            lines.push(Line::from(std::mem::take(spans)));
        }
    };

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => {
                flush(&mut current_spans, &mut lines);
                in_heading = false;
            }
            Event::End(TagEnd::Paragraph) => {
                flush(&mut current_spans, &mut lines);
                if lists.is_empty() {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::List(start)) => {
                flush(&mut current_spans, &mut lines);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut current_spans, &mut lines);
                let depth = lists.len().saturating_sub(1);
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                current_spans.push(Span::styled(
                    format!("{}{}", "  ".repeat(depth), marker),
                    Style::default().fg(Color::Cyan),
                ));
            }
            Event::End(TagEnd::Item) => flush(&mut current_spans, &mut lines),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Emphasis) => in_emphasis = true,
            Event::End(TagEnd::Emphasis) => in_emphasis = false,
            Event::Start(Tag::Strong) => in_strong = true,
            Event::End(TagEnd::Strong) => in_strong = false,
            Event::Text(text) => {
                let style = if in_code_block {
                    Style::default().fg(Color::Yellow)
                } else if in_heading {
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .fg(Color::Cyan)
                } else if in_strong {
                    Style::default().add_modifier(Modifier::BOLD)
                } else if in_emphasis {
                    Style::default().add_modifier(Modifier::ITALIC)
                } else {
                    Style::default()
                };
                if in_code_block {
                    // Code blocks arrive as one text event with embedded newlines.
                    for code_line in text.lines() {
                        lines.push(Line::from(Span::styled(code_line.to_string(), style)));
                    }
                } else {
                    current_spans.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{}`", code),
                    Style::default().fg(Color::Yellow),
                ));
            }
            Event::SoftBreak => current_spans.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut current_spans, &mut lines),
            _ => {}
        }
    }

    flush(&mut current_spans, &mut lines);

    while lines.last().is_some_and(|l| l.spans.is_empty() || l.width() == 0) {
        lines.pop();
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_render_plain_text() {
        assert_eq!(plain(&render_markdown("Hello world")), ["Hello world"]);
    }

    #[test]
    fn test_render_heading_and_paragraph() {
        let lines = render_markdown("# Top\n\nBody text");
        assert_eq!(plain(&lines), ["Top", "Body text"]);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_render_bullets() {
        let lines = render_markdown("- one\n- two");
        assert_eq!(plain(&lines), ["• one", "• two"]);
    }

    #[test]
    fn test_render_numbered_list() {
        let lines = render_markdown("1. first\n2. second");
        assert_eq!(plain(&lines), ["1. first", "2. second"]);
    }

    #[test]
    fn test_render_code_block_lines() {
        let lines = render_markdown("```\na\nb\n```");
        assert_eq!(plain(&lines), ["a", "b"]);
    }

    #[test]
    fn test_render_empty() {
        assert!(render_markdown("").is_empty());
    }

    #[test]
    fn test_control_sequences_removed() {
        let lines = render_markdown("safe\u{1b}[2Jtext");
        assert_eq!(plain(&lines), ["safetext"]);
    }
}
