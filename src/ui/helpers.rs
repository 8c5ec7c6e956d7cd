//! Spawning of background flows.
//!
//! Each spawn clones the handles it needs out of the session, runs the flow
//! in a task and sends the result back as an [`AppEvent`]. Panics inside a
//! task are caught and reported instead of silently killing it.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent};

/// Wraps a future to catch panics and convert them to errors.
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Run `future` in a task and deliver its event, or a `TaskPanicked` event.
fn spawn_flow<F>(task: &'static str, event_tx: &mpsc::Sender<AppEvent>, future: F)
where
    F: std::future::Future<Output = AppEvent> + Send + 'static,
{
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(future).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
        }
    });
}

/// Refresh all feeds in the background. `added` marks a refresh triggered
/// by adding that source; it always runs so the new source is fetched, and
/// supersedes any refresh still in flight.
pub(super) fn spawn_refresh(
    app: &mut App,
    added: Option<String>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if app.refreshing && added.is_none() {
        tracing::debug!("Refresh already running");
        return;
    }
    app.refreshing = true;
    app.refresh_generation += 1;
    let generation = app.refresh_generation;

    let fetcher = app.session.fetcher().clone();
    let sources = app.session.feeds.sources().to_vec();
    tracing::debug!(generation, sources = sources.len(), "Starting refresh");
    spawn_flow("refresh", event_tx, async move {
        let results = fetcher.fetch_all(&sources).await;
        AppEvent::FeedsRefreshed {
            generation,
            results,
            added,
        }
    });
}

pub(super) fn spawn_summary(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.summarizing {
        return;
    }
    app.summarizing = true;

    let client = app.session.completion().clone();
    let credential = app.session.credential().cloned();
    let articles = app.session.feeds.articles().to_vec();
    let status = app.session.status.clone();
    let generation = app.articles_generation;
    spawn_flow("summary", event_tx, async move {
        let summary =
            crate::llm::summarize(&client, credential.as_ref(), &articles, &status).await;
        AppEvent::SummaryReady {
            generation,
            summary,
        }
    });
}

/// Start a chat turn. The transcript updates immediately; the reply
/// arrives as `ChatReply`.
pub(super) fn spawn_chat(app: &mut App, message: &str, event_tx: &mpsc::Sender<AppEvent>) {
    let credential = app.session.credential().cloned();
    let Some(request) =
        app.session
            .chat
            .begin_turn(message, credential.is_some(), &app.session.status)
    else {
        return;
    };
    let Some(key) = credential else {
        return;
    };

    let client = app.session.completion().clone();
    spawn_flow("chat", event_tx, async move {
        let result = client.complete(&key, &request).await;
        AppEvent::ChatReply { request, result }
    });
}

pub(super) fn spawn_proxy(app: &mut App, target: String, event_tx: &mpsc::Sender<AppEvent>) {
    app.proxy_loading = true;
    let proxy = app.session.proxy().clone();
    let status = app.session.status.clone();
    spawn_flow("proxy", event_tx, async move {
        AppEvent::ProxyLoaded(proxy.fetch_via_proxy(&target, &status).await)
    });
}

pub(super) fn spawn_video(app: &mut App, url: String, event_tx: &mpsc::Sender<AppEvent>) {
    let video = app.session.video.clone();
    let status = app.session.status.clone();
    spawn_flow("video", event_tx, async move {
        let result = video.download(&url, &status).await;
        AppEvent::VideoFinished(result.map_err(|e| e.to_string()))
    });
}
