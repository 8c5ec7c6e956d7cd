//! Video download.
//!
//! The downloader is bootstrapped lazily on first use through a
//! [`DownloadBackend`]; the resulting [`DownloadEngine`] is cached for the
//! rest of the process. [`VideoFetch`] drives the state machine and reports
//! progress.

mod fetch;
pub mod ytdlp;

use futures::future::BoxFuture;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::VideoConfig;

pub use fetch::{VideoFetch, VideoStage};
pub use ytdlp::YtDlpBackend;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Please enter a URL")]
    EmptyUrl,
    /// The downloader could not be made ready.
    #[error("{0}")]
    Bootstrap(String),
    /// The downloader rejected or aborted the download. Carries its own text.
    #[error("{0}")]
    Download(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Progress of a running download, as reported by the downloader.
///
/// Fields are the downloader's own display strings ("42.0%", "1.20MiB/s",
/// "00:13"), relayed without reinterpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadState {
    pub percent: String,
    pub speed: String,
    pub eta: String,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self {
            percent: "0.0%".to_string(),
            speed: "0B/s".to_string(),
            eta: "Unknown".to_string(),
        }
    }
}

impl DownloadState {
    /// Completion ratio for a gauge, in `0.0..=1.0`. Unparseable percent
    /// strings count as zero.
    pub fn fraction(&self) -> f64 {
        self.percent
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map(|p| (p / 100.0).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} • {} • ETA: {}", self.percent, self.speed, self.eta)
    }
}

/// What to download and the limits to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub max_height: u32,
    pub max_filesize: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, config: &VideoConfig) -> Self {
        Self {
            url: url.into(),
            max_height: config.max_height,
            max_filesize: config.max_filesize.clone(),
        }
    }

    /// Format selector: best single file within the height and size limits.
    pub fn format(&self) -> String {
        format!(
            "best[height<={}][filesize<={}]",
            self.max_height, self.max_filesize
        )
    }

    /// Output template placing the file, named by title, in `staging`.
    pub fn output_template(&self, staging: &Path) -> String {
        staging.join("%(title)s.%(ext)s").to_string_lossy().into_owned()
    }
}

/// A ready downloader.
pub trait DownloadEngine: Send + Sync {
    /// Download into the engine's staging directory, sending progress as it
    /// arrives. Resolves to the path of the written file.
    fn download<'a>(
        &'a self,
        request: &'a DownloadRequest,
        progress: mpsc::Sender<DownloadState>,
    ) -> BoxFuture<'a, Result<PathBuf, VideoError>>;
}

/// Makes a downloader ready. Called at most once per successful bootstrap.
pub trait DownloadBackend: Send + Sync {
    fn bootstrap(&self) -> BoxFuture<'_, Result<Arc<dyn DownloadEngine>, VideoError>>;
}
