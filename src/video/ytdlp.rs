//! Downloader backed by the `yt-dlp` executable.
//!
//! Progress is read from stdout: with `--newline` and a progress template
//! every update is one `[progress] percent|speed|eta` line, and the final
//! path is printed after the file is moved into place.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::{DownloadBackend, DownloadEngine, DownloadRequest, DownloadState, VideoError};

const PROGRESS_PREFIX: &str = "[progress]";
const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";
const VERSION_TIMEOUT: Duration = Duration::from_secs(15);

/// Bootstraps a [`YtDlpEngine`]: checks the executable answers `--version`
/// and prepares the staging directory.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    program: String,
    staging: PathBuf,
}

impl YtDlpBackend {
    pub fn new(program: impl Into<String>, staging: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            staging: staging.into(),
        }
    }

    async fn probe(&self) -> Result<Arc<dyn DownloadEngine>, VideoError> {
        let output = tokio::time::timeout(
            VERSION_TIMEOUT,
            Command::new(&self.program)
                .arg("--version")
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| VideoError::Bootstrap(format!("{} --version timed out", self.program)))?
        .map_err(|e| VideoError::Bootstrap(format!("cannot run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(VideoError::Bootstrap(format!(
                "{} --version exited with {}",
                self.program, output.status
            )));
        }

        tokio::fs::create_dir_all(&self.staging).await?;

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(program = %self.program, version = %version, "Downloader ready");

        Ok(Arc::new(YtDlpEngine {
            program: self.program.clone(),
            staging: self.staging.clone(),
        }))
    }
}

impl DownloadBackend for YtDlpBackend {
    fn bootstrap(&self) -> BoxFuture<'_, Result<Arc<dyn DownloadEngine>, VideoError>> {
        self.probe().boxed()
    }
}

#[derive(Debug)]
pub struct YtDlpEngine {
    program: String,
    staging: PathBuf,
}

impl YtDlpEngine {
    fn args(&self, request: &DownloadRequest) -> Vec<String> {
        vec![
            "-f".to_string(),
            request.format(),
            "-o".to_string(),
            request.output_template(&self.staging),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--".to_string(),
            request.url.clone(),
        ]
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        progress: mpsc::Sender<DownloadState>,
    ) -> Result<PathBuf, VideoError> {
        tracing::info!(url = %request.url, format = %request.format(), "Starting download");

        let mut child = Command::new(&self.program)
            .args(self.args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VideoError::Download(format!("cannot run {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::Download("downloader stdout unavailable".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VideoError::Download("downloader stderr unavailable".to_string()))?;

        // Drain stderr concurrently so a chatty downloader can't block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut written: Option<PathBuf> = None;

        while let Some(line) = lines.next_line().await? {
            if let Some(state) = parse_progress_line(&line) {
                // Receiver gone means nobody is watching; keep downloading.
                let _ = progress.send(state).await;
            } else if !line.trim().is_empty() {
                written = Some(PathBuf::from(line.trim()));
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let reason = last_error_line(&stderr_text)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} exited with {}", self.program, status));
            return Err(VideoError::Download(reason));
        }

        written.ok_or_else(|| VideoError::Download("downloader reported no output file".to_string()))
    }
}

impl DownloadEngine for YtDlpEngine {
    fn download<'a>(
        &'a self,
        request: &'a DownloadRequest,
        progress: mpsc::Sender<DownloadState>,
    ) -> BoxFuture<'a, Result<PathBuf, VideoError>> {
        self.run(request, progress).boxed()
    }
}

/// Parse one `[progress] percent|speed|eta` line. Missing fields get the
/// downloader's usual placeholders.
fn parse_progress_line(line: &str) -> Option<DownloadState> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut parts = rest.split('|').map(str::trim);
    let defaults = DownloadState::default();

    let mut field = |fallback: String| {
        parts
            .next()
            .filter(|p| !p.is_empty() && *p != "NA")
            .map(str::to_string)
            .unwrap_or(fallback)
    };

    Some(DownloadState {
        percent: field(defaults.percent),
        speed: field(defaults.speed),
        eta: field(defaults.eta),
    })
}

fn last_error_line(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Default staging directory for in-progress downloads.
pub fn default_staging_dir(base: &Path) -> PathBuf {
    base.join("staging")
}
