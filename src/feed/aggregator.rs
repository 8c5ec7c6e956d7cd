use std::cmp::Reverse;
use std::sync::Arc;

use super::{Article, SourceResult};
use crate::llm::Summary;
use crate::status::{Slot, StatusReporter};

/// Articles kept after merging.
pub const MAX_ARTICLES: usize = 20;

/// Notice shown in place of the article list when no source could be loaded.
pub const LOAD_ERROR: &str = "Error loading RSS feeds";

/// What a refresh produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Articles now displayed.
    pub shown: usize,
    pub succeeded: usize,
    /// `(source, error)` for each source that failed.
    pub failed: Vec<(String, String)>,
}

impl RefreshOutcome {
    /// Every source failed (and there was at least one).
    pub fn is_total_failure(&self) -> bool {
        self.succeeded == 0 && !self.failed.is_empty()
    }
}

/// Merge fetched feeds into the display list.
///
/// Each item is tagged with its feed's title. The list is ordered newest
/// first; the sort is stable, so same-timestamp items keep source order, and
/// undated items go after every dated one. Only the first [`MAX_ARTICLES`]
/// are kept. Failed sources contribute nothing.
pub fn merge_articles(results: &[SourceResult]) -> Vec<Article> {
    let mut articles: Vec<Article> = results
        .iter()
        .filter_map(|r| r.result.as_ref().ok())
        .flat_map(|feed| {
            let source: Arc<str> = Arc::from(feed.title.as_str());
            feed.items.iter().map(move |item| Article {
                title: item.title.clone(),
                description: item.description.clone(),
                link: item.link.clone(),
                published: item.published,
                source: Arc::clone(&source),
            })
        })
        .collect();

    articles.sort_by_key(|a| Reverse(a.published));
    articles.truncate(MAX_ARTICLES);
    articles
}

/// The source list and what the last refresh rendered.
///
/// Sources are ordered and duplicate-free. Articles and the summary are
/// replaced wholesale by each refresh.
#[derive(Debug, Default)]
pub struct FeedAggregator {
    sources: Vec<String>,
    articles: Vec<Article>,
    summary: Option<Summary>,
    load_error: Option<&'static str>,
}

impl FeedAggregator {
    /// Build from an initial source list. Blank and repeated entries are dropped.
    pub fn new(sources: impl IntoIterator<Item = String>) -> Self {
        let mut aggregator = Self::default();
        for source in sources {
            aggregator.add_source(&source);
        }
        aggregator
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Notice to show instead of articles after a failed refresh.
    pub fn load_error(&self) -> Option<&'static str> {
        self.load_error
    }

    /// Append a source.
    ///
    /// Input is trimmed. Returns the stored URL, or `None` when the input was
    /// blank or already present (the list is left unchanged). The URL's shape
    /// is not checked.
    pub fn add_source(&mut self, input: &str) -> Option<&str> {
        let url = input.trim();
        if url.is_empty() || self.sources.iter().any(|s| s == url) {
            return None;
        }
        self.sources.push(url.to_string());
        self.sources.last().map(String::as_str)
    }

    /// Replace the rendered state with the result of a fetch round.
    ///
    /// Partial failures are reported on the news status line; only when
    /// every source failed is the list cleared and the load error set.
    pub fn apply_refresh(
        &mut self,
        results: Vec<SourceResult>,
        status: &StatusReporter,
    ) -> RefreshOutcome {
        let failed: Vec<(String, String)> = results
            .iter()
            .filter_map(|r| {
                r.result
                    .as_ref()
                    .err()
                    .map(|e| (r.source.clone(), e.to_string()))
            })
            .collect();
        let succeeded = results.len() - failed.len();

        self.summary = None;

        if succeeded == 0 && !failed.is_empty() {
            tracing::error!(sources = failed.len(), "All feed sources failed");
            self.articles.clear();
            self.load_error = Some(LOAD_ERROR);
            return RefreshOutcome {
                shown: 0,
                succeeded,
                failed,
            };
        }

        self.articles = merge_articles(&results);
        self.load_error = None;

        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|(source, _)| source.as_str()).collect();
            status.error(
                Slot::News,
                format!(
                    "{} of {} feeds failed to load: {}",
                    failed.len(),
                    results.len(),
                    names.join(", ")
                ),
            );
        }

        tracing::info!(
            shown = self.articles.len(),
            succeeded = succeeded,
            failed = failed.len(),
            "Feeds refreshed"
        );

        RefreshOutcome {
            shown: self.articles.len(),
            succeeded,
            failed,
        }
    }

    /// Place a summary ahead of the articles until the next refresh.
    pub fn set_summary(&mut self, summary: Summary) {
        self.summary = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedError, FeedItem, FetchedFeed};
    use pretty_assertions::assert_eq;

    fn item(title: &str, published: Option<i64>) -> FeedItem {
        FeedItem {
            title: title.into(),
            description: String::new(),
            link: format!("https://example.com/{title}"),
            published,
        }
    }

    fn ok(source: &str, title: &str, items: Vec<FeedItem>) -> SourceResult {
        SourceResult {
            source: source.into(),
            result: Ok(FetchedFeed {
                title: title.into(),
                items,
            }),
        }
    }

    fn failed(source: &str) -> SourceResult {
        SourceResult {
            source: source.into(),
            result: Err(FeedError::HttpStatus(500)),
        }
    }

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_add_source_trims_and_appends() {
        let mut agg = FeedAggregator::new(Vec::new());
        assert_eq!(agg.add_source("  https://a.example/rss  "), Some("https://a.example/rss"));
        assert_eq!(agg.sources(), ["https://a.example/rss"]);
    }

    #[test]
    fn test_add_source_rejects_blank_and_duplicate() {
        let mut agg = FeedAggregator::new(vec!["https://a.example/rss".to_string()]);
        assert_eq!(agg.add_source("   "), None);
        assert_eq!(agg.add_source("https://a.example/rss"), None);
        assert_eq!(agg.add_source(" https://a.example/rss "), None);
        assert_eq!(agg.sources().len(), 1);
    }

    #[test]
    fn test_add_source_accepts_any_shape() {
        let mut agg = FeedAggregator::default();
        assert!(agg.add_source("not a url").is_some());
    }

    #[test]
    fn test_new_drops_repeats() {
        let agg = FeedAggregator::new(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(agg.sources(), ["a", "b"]);
    }

    #[test]
    fn test_merge_sorts_newest_first_and_tags_source() {
        let results = vec![
            ok("s1", "One", vec![item("old", Some(100)), item("new", Some(300))]),
            ok("s2", "Two", vec![item("mid", Some(200))]),
        ];
        let merged = merge_articles(&results);
        assert_eq!(titles(&merged), ["new", "mid", "old"]);
        assert_eq!(&*merged[1].source, "Two");
    }

    #[test]
    fn test_merge_undated_last_and_stable() {
        let results = vec![ok(
            "s",
            "S",
            vec![
                item("undated-a", None),
                item("tie-a", Some(5)),
                item("undated-b", None),
                item("tie-b", Some(5)),
            ],
        )];
        let merged = merge_articles(&results);
        assert_eq!(titles(&merged), ["tie-a", "tie-b", "undated-a", "undated-b"]);
    }

    #[test]
    fn test_merge_truncates_to_twenty() {
        let items: Vec<_> = (0..30).map(|i| item(&format!("a{i}"), Some(i))).collect();
        let merged = merge_articles(&[ok("s", "S", items)]);
        assert_eq!(merged.len(), MAX_ARTICLES);
        assert_eq!(merged[0].title, "a29");
    }

    #[test]
    fn test_partial_failure_keeps_successes() {
        let status = StatusReporter::new();
        let mut agg = FeedAggregator::default();
        let outcome = agg.apply_refresh(
            vec![failed("https://down.example"), ok("s2", "Two", vec![item("x", Some(1))])],
            &status,
        );

        assert_eq!(outcome.succeeded, 1);
        assert!(!outcome.is_total_failure());
        assert_eq!(titles(agg.articles()), ["x"]);
        assert_eq!(agg.load_error(), None);
        let line = status.current(Slot::News).unwrap();
        assert!(line.message.contains("https://down.example"));
    }

    #[test]
    fn test_total_failure_clears_list() {
        let status = StatusReporter::new();
        let mut agg = FeedAggregator::default();
        agg.apply_refresh(vec![ok("s", "S", vec![item("x", Some(1))])], &status);
        assert_eq!(agg.articles().len(), 1);

        let outcome = agg.apply_refresh(vec![failed("a"), failed("b")], &status);
        assert!(outcome.is_total_failure());
        assert!(agg.articles().is_empty());
        assert_eq!(agg.load_error(), Some(LOAD_ERROR));
    }

    #[test]
    fn test_no_sources_is_not_a_failure() {
        let status = StatusReporter::new();
        let mut agg = FeedAggregator::default();
        let outcome = agg.apply_refresh(Vec::new(), &status);
        assert!(!outcome.is_total_failure());
        assert_eq!(agg.load_error(), None);
    }

    #[test]
    fn test_refresh_drops_previous_summary() {
        let status = StatusReporter::new();
        let mut agg = FeedAggregator::default();
        agg.set_summary(Summary::new("old news"));
        agg.apply_refresh(vec![ok("s", "S", Vec::new())], &status);
        assert!(agg.summary().is_none());
    }
}
