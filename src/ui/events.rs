//! Application event handling.
//!
//! Applies the results of background flows to the session.

use crate::app::{App, AppEvent};
use crate::status::Slot;

use super::markdown::render_markdown;

/// Handle one event from a background task.
pub(super) async fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::FeedsRefreshed {
            generation,
            results,
            added,
        } => {
            if generation != app.refresh_generation {
                tracing::debug!(
                    expected = app.refresh_generation,
                    got = generation,
                    "Ignoring stale refresh result (generation mismatch)"
                );
                return;
            }
            app.refreshing = false;
            app.articles_generation = generation;
            app.session
                .feeds
                .apply_refresh(results, &app.session.status);
            app.summary_lines.clear();
            app.scroll[crate::app::Panel::News.index()] = 0;
            if added.is_some() {
                app.session.status.success(Slot::News, "RSS feed added!");
            }
        }
        AppEvent::SummaryReady {
            generation,
            summary,
        } => {
            app.summarizing = false;
            if generation != app.articles_generation {
                tracing::debug!(
                    expected = app.articles_generation,
                    got = generation,
                    "Ignoring summary of superseded articles"
                );
                return;
            }
            if let Some(summary) = summary {
                app.summary_lines = render_markdown(&summary.text);
                app.session.feeds.set_summary(summary);
            }
        }
        AppEvent::ChatReply { request, result } => {
            let session = &mut app.session;
            if let Some(history) = session.chat.finish_turn(request, result, &session.status) {
                if let Err(e) = session.db.save_chat_history(history).await {
                    tracing::warn!(error = %e, "Failed to persist chat history");
                }
            }
        }
        AppEvent::ProxyLoaded(content) => {
            app.proxy_loading = false;
            if let Some(content) = content {
                app.session.set_proxy_content(content);
                app.scroll[crate::app::Panel::Proxy.index()] = 0;
            }
        }
        AppEvent::VideoFinished(result) => match result {
            Ok(Some(path)) => tracing::info!(path = %path.display(), "Video ready"),
            Ok(None) => {}
            Err(error) => tracing::debug!(error = %error, "Video flow ended with error"),
        },
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            match task {
                "refresh" => app.refreshing = false,
                "summary" => app.summarizing = false,
                "proxy" => app.proxy_loading = false,
                "chat" => app.session.chat.abandon_turn(),
                _ => {}
            }
            app.session
                .status
                .report(format!("Internal error in {} task", task), crate::status::Severity::Error, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Panel;
    use crate::config::Config;
    use crate::feed::{FeedError, FeedItem, FetchedFeed, SourceResult};
    use crate::llm::{ChatMessage, Summary};
    use crate::session::Session;
    use crate::storage::Database;
    use std::path::Path;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let session = Session::load(Config::default(), db, reqwest::Client::new(), Path::new("/tmp"))
            .await
            .unwrap();
        App::new(session)
    }

    fn feed_result(source: &str, titles: &[&str]) -> SourceResult {
        SourceResult {
            source: source.into(),
            result: Ok(FetchedFeed {
                title: "Wire".into(),
                items: titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| FeedItem {
                        title: title.to_string(),
                        description: String::new(),
                        link: format!("https://wire.example/{title}"),
                        published: Some(10 + i as i64),
                    })
                    .collect(),
            }),
        }
    }

    fn article_titles(app: &App) -> Vec<String> {
        app.session
            .feeds
            .articles()
            .iter()
            .map(|a| a.title.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_refresh_event_populates_articles() {
        let mut app = test_app().await;
        app.refreshing = true;

        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 0,
                results: vec![feed_result("s", &["Hello"])],
                added: Some("s".into()),
            },
        )
        .await;

        assert!(!app.refreshing);
        assert_eq!(app.session.feeds.articles().len(), 1);
        assert_eq!(
            app.session.status.current(Slot::News).unwrap().message,
            "RSS feed added!"
        );
    }

    #[tokio::test]
    async fn test_older_refresh_does_not_overwrite_newer() {
        let mut app = test_app().await;
        app.refreshing = true;
        app.refresh_generation = 2;

        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 2,
                results: vec![
                    feed_result("old", &["a"]),
                    feed_result("new", &["from-new-source"]),
                ],
                added: Some("new".into()),
            },
        )
        .await;
        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 1,
                results: vec![feed_result("old", &["a"])],
                added: None,
            },
        )
        .await;

        assert_eq!(article_titles(&app), ["a", "from-new-source"]);
        assert_eq!(app.articles_generation, 2);
        assert!(!app.refreshing);
    }

    #[tokio::test]
    async fn test_older_refresh_leaves_refreshing_set() {
        let mut app = test_app().await;
        app.refreshing = true;
        app.refresh_generation = 2;

        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 1,
                results: vec![feed_result("old", &["a"])],
                added: None,
            },
        )
        .await;

        assert!(app.refreshing);
        assert!(app.session.feeds.articles().is_empty());
    }

    #[tokio::test]
    async fn test_all_failed_refresh_sets_load_error() {
        let mut app = test_app().await;
        let results = vec![SourceResult {
            source: "s".into(),
            result: Err(FeedError::HttpStatus(503)),
        }];
        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 0,
                results,
                added: None,
            },
        )
        .await;
        assert!(app.session.feeds.load_error().is_some());
    }

    #[tokio::test]
    async fn test_summary_event_renders_markdown() {
        let mut app = test_app().await;
        app.summarizing = true;
        handle_app_event(
            &mut app,
            AppEvent::SummaryReady {
                generation: 0,
                summary: Some(Summary::new("**Top story**")),
            },
        )
        .await;
        assert!(!app.summarizing);
        assert!(!app.summary_lines.is_empty());
        assert!(app.session.feeds.summary().is_some());
    }

    #[tokio::test]
    async fn test_summary_of_superseded_articles_dropped() {
        let mut app = test_app().await;
        app.summarizing = true;
        app.refresh_generation = 1;
        handle_app_event(
            &mut app,
            AppEvent::FeedsRefreshed {
                generation: 1,
                results: vec![feed_result("s", &["fresh"])],
                added: None,
            },
        )
        .await;

        handle_app_event(
            &mut app,
            AppEvent::SummaryReady {
                generation: 0,
                summary: Some(Summary::new("About the old list")),
            },
        )
        .await;

        assert!(!app.summarizing);
        assert!(app.summary_lines.is_empty());
        assert!(app.session.feeds.summary().is_none());
    }

    #[tokio::test]
    async fn test_chat_reply_event_persists_history() {
        let mut app = test_app().await;
        let request = app
            .session
            .chat
            .begin_turn("hi", true, &app.session.status)
            .unwrap();

        handle_app_event(
            &mut app,
            AppEvent::ChatReply {
                request,
                result: Ok(Some("hello".into())),
            },
        )
        .await;

        assert_eq!(
            app.session.db.load_chat_history().await.unwrap(),
            vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn test_proxy_event_sets_content() {
        let mut app = test_app().await;
        app.switch_panel(Panel::Proxy);
        app.scroll_by(5);
        handle_app_event(&mut app, AppEvent::ProxyLoaded(Some("body".into()))).await;
        assert_eq!(app.session.proxy_content(), Some("body"));
        assert_eq!(app.scroll[Panel::Proxy.index()], 0);
    }

    #[tokio::test]
    async fn test_panic_event_reports_on_active_slot() {
        let mut app = test_app().await;
        app.refreshing = true;
        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "refresh",
                error: "boom".into(),
            },
        )
        .await;
        assert!(!app.refreshing);
        assert_eq!(
            app.session.status.current(Slot::News).unwrap().message,
            "Internal error in refresh task"
        );
    }

    // ========================================================================
    // Key press to applied event, against mock endpoints
    // ========================================================================

    use crate::ui::input::handle_input;
    use crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OLD_SOURCE: &str = "https://old.example/rss";
    const NEW_SOURCE: &str = "https://new.example/rss";

    async fn mount_source(server: &MockServer, url: &str, title: &str) {
        Mock::given(method("GET"))
            .and(path("/api.json"))
            .and(query_param("rss_url", url))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "feed": { "title": "Wire" },
                "items": [{
                    "title": title,
                    "pubDate": "2024-03-01 08:00:00",
                    "link": format!("https://news.example/{title}"),
                    "description": "",
                }],
            })))
            .mount(server)
            .await;
    }

    async fn app_for(server: &MockServer) -> App {
        let config = Config {
            feed_converter_url: format!("{}/api.json", server.uri()),
            completion_url: format!("{}/v1/chat/completions", server.uri()),
            default_feeds: vec![OLD_SOURCE.to_string()],
            ..Config::default()
        };
        let db = Database::open(":memory:").await.unwrap();
        let session = Session::load(config, db, reqwest::Client::new(), Path::new("/tmp"))
            .await
            .unwrap();
        App::new(session)
    }

    async fn keys(app: &mut App, codes: &[KeyCode], tx: &mpsc::Sender<AppEvent>) {
        for &code in codes {
            handle_input(app, code, KeyModifiers::NONE, tx).await.unwrap();
        }
    }

    async fn type_line(app: &mut App, text: &str, tx: &mpsc::Sender<AppEvent>) {
        for c in text.chars() {
            keys(app, &[KeyCode::Char(c)], tx).await;
        }
        keys(app, &[KeyCode::Enter], tx).await;
    }

    async fn apply_next(app: &mut App, rx: &mut mpsc::Receiver<AppEvent>) {
        let event = rx.recv().await.expect("background event");
        handle_app_event(app, event).await;
    }

    #[tokio::test]
    async fn test_added_source_survives_concurrent_refresh() {
        let server = MockServer::start().await;
        mount_source(&server, OLD_SOURCE, "a").await;
        mount_source(&server, NEW_SOURCE, "from-new-source").await;

        let mut app = app_for(&server).await;
        let (tx, mut rx) = mpsc::channel(8);

        keys(&mut app, &[KeyCode::Char('r'), KeyCode::Char('a')], &tx).await;
        type_line(&mut app, NEW_SOURCE, &tx).await;
        assert_eq!(app.refresh_generation, 2);

        // Either arrival order ends on the refresh that includes the new source.
        apply_next(&mut app, &mut rx).await;
        apply_next(&mut app, &mut rx).await;

        assert!(!app.refreshing);
        assert_eq!(app.articles_generation, 2);
        assert_eq!(article_titles(&app), ["a", "from-new-source"]);
        assert_eq!(
            app.session.status.current(Slot::News).unwrap().message,
            "RSS feed added!"
        );
    }

    #[tokio::test]
    async fn test_summary_key_attaches_summary() {
        let server = MockServer::start().await;
        mount_source(&server, OLD_SOURCE, "a").await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "**Digest**" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server).await;
        app.session.save_credential("sk-test").await;
        let (tx, mut rx) = mpsc::channel(8);

        keys(&mut app, &[KeyCode::Char('r')], &tx).await;
        apply_next(&mut app, &mut rx).await;
        keys(&mut app, &[KeyCode::Char('s')], &tx).await;
        assert!(app.summarizing);
        apply_next(&mut app, &mut rx).await;

        assert!(!app.summarizing);
        assert_eq!(app.session.feeds.summary().unwrap().text, "**Digest**");
        assert!(!app.summary_lines.is_empty());
    }

    #[tokio::test]
    async fn test_chat_enter_persists_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "hello back" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server).await;
        app.session.save_credential("sk-test").await;
        let (tx, mut rx) = mpsc::channel(8);

        keys(&mut app, &[KeyCode::Char('2'), KeyCode::Char('i')], &tx).await;
        type_line(&mut app, "hello", &tx).await;
        assert!(app.session.chat.is_in_flight());
        apply_next(&mut app, &mut rx).await;

        assert!(!app.session.chat.is_in_flight());
        assert_eq!(
            app.session.db.load_chat_history().await.unwrap(),
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hello back")]
        );
    }
}
