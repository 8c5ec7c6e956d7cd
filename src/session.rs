//! The dashboard's state, loaded once at startup and passed explicitly to
//! every flow.

use anyhow::Result;
use reqwest::redirect::Policy;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::feed::{FeedAggregator, FeedFetcher, RefreshOutcome};
use crate::llm::{summarize, ChatSession, CompletionClient};
use crate::proxy::ProxyClient;
use crate::status::{Severity, Slot, StatusReporter};
use crate::storage::Database;
use crate::video::{ytdlp, DownloadBackend, VideoError, VideoFetch, YtDlpBackend};

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Redirect policy: at most 3 hops, no loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// The shared HTTP client used by every flow.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("newsdeck/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Where finished videos go: the configured directory, else `~/Downloads`
/// when it exists, else `downloads/` under the data directory.
pub fn resolve_save_dir(config: &Config, data_dir: &Path) -> PathBuf {
    if let Some(dir) = &config.video.save_dir {
        return dir.clone();
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Downloads"))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| data_dir.join("downloads"))
}

// ============================================================================
// Session
// ============================================================================

/// Everything the dashboard knows.
///
/// Flow methods report through [`Session::status`] and never fail outright;
/// errors end up on a status line.
pub struct Session {
    pub config: Config,
    pub db: Database,
    pub status: StatusReporter,
    pub feeds: FeedAggregator,
    pub chat: ChatSession,
    pub video: VideoFetch,
    credential: Option<SecretString>,
    fetcher: FeedFetcher,
    completion: CompletionClient,
    proxy: ProxyClient,
    proxy_content: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("has_credential", &self.credential.is_some())
            .field("sources", &self.feeds.sources().len())
            .field("video", &self.video)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Assemble the session from config and storage.
    ///
    /// Credential precedence: stored key, then `OPENROUTER_API_KEY`, then the
    /// config file. Feed sources come from the config defaults unless
    /// `persist_feeds` is set and a list was stored.
    pub async fn load(
        config: Config,
        db: Database,
        http: reqwest::Client,
        data_dir: &Path,
    ) -> Result<Self> {
        let credential = match db.load_credential().await? {
            Some(key) => Some(key),
            None => config.fallback_api_key().map(SecretString::from),
        };

        let history = db.load_chat_history().await?;

        let sources = if config.persist_feeds {
            db.load_feed_sources()
                .await?
                .unwrap_or_else(|| config.default_feeds.clone())
        } else {
            config.default_feeds.clone()
        };

        let backend: Arc<dyn DownloadBackend> = Arc::new(YtDlpBackend::new(
            config.video.downloader.clone(),
            ytdlp::default_staging_dir(data_dir),
        ));
        let video = VideoFetch::new(
            backend,
            config.video.clone(),
            resolve_save_dir(&config, data_dir),
        );

        tracing::info!(
            sources = sources.len(),
            history = history.len(),
            has_credential = credential.is_some(),
            "Session loaded"
        );

        Ok(Self {
            fetcher: FeedFetcher::new(http.clone(), config.feed_mode, config.feed_converter_url.clone()),
            completion: CompletionClient::new(
                http.clone(),
                config.completion_url.clone(),
                config.model.clone(),
            ),
            proxy: ProxyClient::new(http, config.proxy_url.clone()),
            feeds: FeedAggregator::new(sources),
            chat: ChatSession::new(history),
            status: StatusReporter::new(),
            credential,
            video,
            proxy_content: None,
            db,
            config,
        })
    }

    /// Swap the video downloader, e.g. for a scripted one.
    pub fn with_video_backend(mut self, backend: Arc<dyn DownloadBackend>) -> Self {
        let save_dir = self.video.save_dir().to_path_buf();
        self.video = VideoFetch::new(backend, self.config.video.clone(), save_dir);
        self
    }

    pub fn credential(&self) -> Option<&SecretString> {
        self.credential.as_ref()
    }

    pub fn fetcher(&self) -> &FeedFetcher {
        &self.fetcher
    }

    pub fn completion(&self) -> &CompletionClient {
        &self.completion
    }

    pub fn proxy(&self) -> &ProxyClient {
        &self.proxy
    }

    /// Content area of the proxy panel.
    pub fn proxy_content(&self) -> Option<&str> {
        self.proxy_content.as_deref()
    }

    pub fn set_proxy_content(&mut self, content: String) {
        self.proxy_content = Some(content);
    }

    // ========================================================================
    // Credential
    // ========================================================================

    /// Store the credential exactly as entered. An empty entry clears it.
    pub async fn save_credential(&mut self, input: &str) {
        let key = SecretString::from(input.to_string());
        if let Err(e) = self.db.save_credential(&key).await {
            tracing::warn!(error = %e, "Failed to persist API key");
            self.status
                .report("Failed to save API key", Severity::Error, None);
            return;
        }
        self.credential = if input.is_empty() { None } else { Some(key) };
        self.status.report("API key saved!", Severity::Success, None);
    }

    // ========================================================================
    // Feeds
    // ========================================================================

    /// Fetch every source and replace the article list.
    pub async fn refresh_feeds(&mut self) -> RefreshOutcome {
        let results = self.fetcher.fetch_all(self.feeds.sources()).await;
        self.feeds.apply_refresh(results, &self.status)
    }

    /// Add a source and refresh. Returns false (and changes nothing) for
    /// blank or duplicate input.
    pub async fn add_source(&mut self, input: &str) -> bool {
        if self.register_source(input).await.is_none() {
            return false;
        }
        self.refresh_feeds().await;
        self.status.success(Slot::News, "RSS feed added!");
        true
    }

    /// Append a source and persist the list, without refreshing.
    ///
    /// Returns the normalized URL, or `None` for blank or duplicate input.
    pub async fn register_source(&mut self, input: &str) -> Option<String> {
        let Some(url) = self.feeds.add_source(input).map(str::to_string) else {
            tracing::debug!(input = %input, "Ignoring blank or duplicate feed source");
            return None;
        };
        tracing::info!(url = %url, "Feed source added");
        self.persist_sources().await;
        Some(url)
    }

    /// Write the source list to storage when persistence is enabled.
    async fn persist_sources(&self) {
        if !self.config.persist_feeds {
            return;
        }
        if let Err(e) = self.db.save_feed_sources(self.feeds.sources()).await {
            tracing::warn!(error = %e, "Failed to persist feed sources");
        }
    }

    /// Summarize the articles from the last refresh.
    pub async fn summarize(&mut self) {
        let summary = summarize(
            &self.completion,
            self.credential.as_ref(),
            self.feeds.articles(),
            &self.status,
        )
        .await;
        if let Some(summary) = summary {
            self.feeds.set_summary(summary);
        }
    }

    // ========================================================================
    // Chat
    // ========================================================================

    pub async fn send_chat(&mut self, input: &str) {
        self.chat
            .send(
                &self.completion,
                self.credential.as_ref(),
                input,
                &self.db,
                &self.status,
            )
            .await;
    }

    pub async fn clear_chat(&mut self) {
        match self.chat.clear(&self.db).await {
            Ok(()) => self.status.success(Slot::Chat, "Chat cleared"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear chat history");
                self.status.error(Slot::Chat, "Failed to clear chat history");
            }
        }
    }

    // ========================================================================
    // Proxy and Video
    // ========================================================================

    pub async fn fetch_via_proxy(&mut self, input: &str) {
        if let Some(content) = self.proxy.fetch_via_proxy(input, &self.status).await {
            self.proxy_content = Some(content);
        }
    }

    pub async fn download_video(&self, url: &str) -> Result<Option<PathBuf>, VideoError> {
        self.video.download(url, &self.status).await
    }
}
