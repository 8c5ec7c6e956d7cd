use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::mpsc;

use super::{DownloadBackend, DownloadEngine, DownloadRequest, DownloadState, VideoError};
use crate::config::VideoConfig;
use crate::status::{Slot, StatusReporter};

const PROGRESS_BUFFER: usize = 32;

/// Where the video flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStage {
    Uninitialized,
    Initializing,
    Ready,
    Downloading,
    Finished,
    Failed,
}

struct Inner {
    backend: Arc<dyn DownloadBackend>,
    config: VideoConfig,
    save_dir: PathBuf,
    engine: OnceLock<Arc<dyn DownloadEngine>>,
    bootstrapping: AtomicBool,
    stage: Mutex<VideoStage>,
    /// `None` hides the progress indicator.
    progress: Mutex<Option<DownloadState>>,
    last_file: Mutex<Option<PathBuf>>,
}

enum Claim {
    Cached(Arc<dyn DownloadEngine>),
    Busy,
    Won,
}

/// The video download flow.
///
/// Cheap to clone; clones share the cached engine and state, so a spawned
/// task and the front end see the same progress.
#[derive(Clone)]
pub struct VideoFetch {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VideoFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFetch")
            .field("stage", &self.stage())
            .field("save_dir", &self.inner.save_dir)
            .finish_non_exhaustive()
    }
}

impl VideoFetch {
    pub fn new(backend: Arc<dyn DownloadBackend>, config: VideoConfig, save_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                save_dir,
                engine: OnceLock::new(),
                bootstrapping: AtomicBool::new(false),
                stage: Mutex::new(VideoStage::Uninitialized),
                progress: Mutex::new(None),
                last_file: Mutex::new(None),
            }),
        }
    }

    pub fn stage(&self) -> VideoStage {
        *self.inner.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Latest progress, `None` when the indicator is hidden.
    pub fn progress(&self) -> Option<DownloadState> {
        self.inner
            .progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recently saved video.
    pub fn last_file(&self) -> Option<PathBuf> {
        self.inner
            .last_file
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn save_dir(&self) -> &Path {
        &self.inner.save_dir
    }

    fn set_stage(&self, stage: VideoStage) {
        tracing::debug!(?stage, "Video stage");
        *self.inner.stage.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    fn set_progress(&self, state: Option<DownloadState>) {
        *self.inner.progress.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Download `url` and save the result.
    ///
    /// Returns the saved path, or `Ok(None)` when the call was dropped
    /// because the downloader is still bootstrapping for an earlier call.
    /// Every outcome is also reported on the video status line.
    pub async fn download(
        &self,
        url: &str,
        status: &StatusReporter,
    ) -> Result<Option<PathBuf>, VideoError> {
        let url = url.trim();
        if url.is_empty() {
            status.error(Slot::Video, VideoError::EmptyUrl.to_string());
            return Err(VideoError::EmptyUrl);
        }

        let Some(engine) = self.engine(status).await? else {
            return Ok(None);
        };

        self.set_stage(VideoStage::Downloading);
        self.set_progress(Some(DownloadState::default()));
        status.info(Slot::Video, "Starting download...");

        let request = DownloadRequest::new(url, &self.inner.config);
        let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);

        let relay = async {
            while let Some(state) = rx.recv().await {
                self.set_progress(Some(state));
            }
        };
        let (result, ()) = tokio::join!(engine.download(&request, tx), relay);

        let saved = match result {
            Ok(staged) => self.save(&staged).await,
            Err(e) => Err(e),
        };

        match saved {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Video saved");
                *self.inner.last_file.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(path.clone());
                self.set_stage(VideoStage::Finished);
                status.success(Slot::Video, "Download complete!");
                Ok(Some(path))
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Video download failed");
                self.set_stage(VideoStage::Failed);
                self.set_progress(None);
                status.error(Slot::Video, format!("Download failed: {e}"));
                Err(e)
            }
        }
    }

    /// The cached engine, bootstrapping it on first use.
    ///
    /// `Ok(None)` means another call is bootstrapping right now.
    async fn engine(
        &self,
        status: &StatusReporter,
    ) -> Result<Option<Arc<dyn DownloadEngine>>, VideoError> {
        if let Some(engine) = self.inner.engine.get() {
            return Ok(Some(Arc::clone(engine)));
        }

        match self.claim_bootstrap() {
            Claim::Cached(engine) => return Ok(Some(engine)),
            Claim::Busy => {
                tracing::debug!("Downloader bootstrap already running, ignoring request");
                return Ok(None);
            }
            Claim::Won => {}
        }

        self.set_stage(VideoStage::Initializing);
        status.info(Slot::Video, "Loading downloader...");

        let result = self.inner.backend.bootstrap().await;

        let outcome = match result {
            Ok(engine) => {
                let engine = Arc::clone(self.inner.engine.get_or_init(|| engine));
                self.set_stage(VideoStage::Ready);
                status.success(Slot::Video, "Ready!");
                Ok(Some(engine))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Downloader bootstrap failed");
                self.set_stage(VideoStage::Failed);
                status.error(Slot::Video, format!("Error initializing: {e}"));
                Err(e)
            }
        };

        self.inner.bootstrapping.store(false, Ordering::Release);
        outcome
    }

    /// Take the bootstrap flag. An engine cached by a bootstrap that
    /// finished after the caller's check is returned instead.
    fn claim_bootstrap(&self) -> Claim {
        if self
            .inner
            .bootstrapping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Claim::Busy;
        }
        if let Some(engine) = self.inner.engine.get() {
            self.inner.bootstrapping.store(false, Ordering::Release);
            return Claim::Cached(Arc::clone(engine));
        }
        Claim::Won
    }

    /// Move a staged file into the save directory.
    async fn save(&self, staged: &Path) -> Result<PathBuf, VideoError> {
        let name = staged
            .file_name()
            .ok_or_else(|| VideoError::Download(format!("bad output path {}", staged.display())))?;

        tokio::fs::create_dir_all(&self.inner.save_dir).await?;
        let target = self.inner.save_dir.join(name);

        let data = tokio::fs::read(staged).await?;
        tokio::fs::write(&target, &data).await?;
        if let Err(e) = tokio::fs::remove_file(staged).await {
            tracing::warn!(path = %staged.display(), error = %e, "Failed to remove staged video");
        }

        Ok(target)
    }

    /// Open the last saved video with the system viewer.
    pub fn open_last(&self) -> Result<(), VideoError> {
        let Some(path) = self.last_file() else {
            return Err(VideoError::Download("No video downloaded yet".to_string()));
        };
        open::that_detached(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Severity;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    struct FailingEngine;

    impl DownloadEngine for FailingEngine {
        fn download<'a>(
            &'a self,
            _request: &'a DownloadRequest,
            progress: mpsc::Sender<DownloadState>,
        ) -> BoxFuture<'a, Result<PathBuf, VideoError>> {
            async move {
                let _ = progress
                    .send(DownloadState {
                        percent: "10.0%".into(),
                        ..DownloadState::default()
                    })
                    .await;
                Err(VideoError::Download("ERROR: Unsupported URL".into()))
            }
            .boxed()
        }
    }

    struct CountingBackend {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl DownloadBackend for CountingBackend {
        fn bootstrap(&self) -> BoxFuture<'_, Result<Arc<dyn DownloadEngine>, VideoError>> {
            async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_first && n == 0 {
                    return Err(VideoError::Bootstrap("offline".into()));
                }
                Ok(Arc::new(FailingEngine) as Arc<dyn DownloadEngine>)
            }
            .boxed()
        }
    }

    fn fetcher(fail_first: bool) -> (VideoFetch, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
            fail_first,
        });
        let fetch = VideoFetch::new(
            backend.clone(),
            VideoConfig::default(),
            std::env::temp_dir().join("newsdeck_video_fetch_unit"),
        );
        (fetch, backend)
    }

    #[tokio::test]
    async fn test_empty_url_rejected_before_bootstrap() {
        let (fetch, backend) = fetcher(false);
        let status = StatusReporter::new();
        let err = fetch.download("  ", &status).await.unwrap_err();
        assert!(matches!(err, VideoError::EmptyUrl));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fetch.stage(), VideoStage::Uninitialized);
        assert_eq!(status.current(Slot::Video).unwrap().message, "Please enter a URL");
    }

    #[tokio::test]
    async fn test_rejection_surfaces_raw_error_and_hides_progress() {
        let (fetch, _) = fetcher(false);
        let status = StatusReporter::new();
        let err = fetch.download("https://v.example/1", &status).await.unwrap_err();

        assert_eq!(err.to_string(), "ERROR: Unsupported URL");
        assert_eq!(fetch.stage(), VideoStage::Failed);
        assert_eq!(fetch.progress(), None);
        let line = status.current(Slot::Video).unwrap();
        assert_eq!(line.message, "Download failed: ERROR: Unsupported URL");
        assert_eq!(line.severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_claim_after_bootstrap_finished_uses_cached_engine() {
        let (fetch, backend) = fetcher(false);
        let cached: Arc<dyn DownloadEngine> = Arc::new(FailingEngine);
        assert!(fetch.inner.engine.set(cached).is_ok());

        assert!(matches!(fetch.claim_bootstrap(), Claim::Cached(_)));
        assert!(!fetch.inner.bootstrapping.load(Ordering::SeqCst));

        let status = StatusReporter::new();
        let _ = fetch.download("https://v.example/1", &status).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_retried() {
        let (fetch, backend) = fetcher(true);
        let status = StatusReporter::new();

        let err = fetch.download("https://v.example/1", &status).await.unwrap_err();
        assert!(matches!(err, VideoError::Bootstrap(_)));
        assert_eq!(
            status.current(Slot::Video).unwrap().message,
            "Error initializing: offline"
        );

        // Second attempt bootstraps again, then reaches the engine.
        let _ = fetch.download("https://v.example/1", &status).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

        // Engine now cached.
        let _ = fetch.download("https://v.example/1", &status).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
