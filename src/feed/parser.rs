use feed_rs::parser;

use super::{FeedError, FeedItem, FetchedFeed};
use crate::util::strip_control_chars;

/// Parse raw RSS/Atom bytes into a feed.
///
/// Entries without a title become "Untitled". The description is the entry
/// summary, falling back to its content body.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed, FeedError> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| strip_control_chars(t.content.trim()).into_owned())
        .unwrap_or_default();

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            FeedItem {
                title: strip_control_chars(title.trim()).into_owned(),
                description: strip_control_chars(&description).into_owned(),
                link,
                published,
            }
        })
        .collect();

    Ok(FetchedFeed { title, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Local Wire</title>
    <link>https://wire.example</link>
    <description>d</description>
    <item>
      <title>First</title>
      <link>https://wire.example/1</link>
      <description>One</description>
      <pubDate>Fri, 01 Mar 2024 12:00:00 +0000</pubDate>
    </item>
    <item>
      <link>https://wire.example/2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Local Wire");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "First");
        assert_eq!(feed.items[0].description, "One");
        assert_eq!(feed.items[0].published, Some(1_709_294_400));
        assert_eq!(feed.items[1].title, "Untitled");
        assert_eq!(feed.items[1].published, None);
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Desk</title>
  <id>urn:desk</id>
  <updated>2024-03-01T12:00:00Z</updated>
  <entry>
    <title>Entry</title>
    <id>urn:desk:1</id>
    <link href="https://desk.example/1"/>
    <updated>2024-03-01T12:00:00Z</updated>
    <summary>Sum</summary>
  </entry>
</feed>"#;
        let feed = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Desk");
        assert_eq!(feed.items[0].link, "https://desk.example/1");
        assert_eq!(feed.items[0].description, "Sum");
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(parse_feed(b"not a feed"), Err(FeedError::Parse(_))));
    }
}
