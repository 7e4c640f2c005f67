//! Shared test helpers: a scriptable mock extractor and orchestrator
//! factories.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::{Error, Result};
use crate::extractor::{ExtractRequest, Extractor, Inspection};
use crate::store::JobStore;
use crate::types::{MediaMetadata, Platform, ProgressUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// URLs containing this marker make the mock's download hang until
/// cancelled (or for `hang_delay`, whichever comes first)
pub(crate) const HANG_MARKER: &str = "hang";

/// Scriptable in-process extractor.
///
/// Inspect returns canned metadata (platform detected from the URL);
/// download optionally streams progress samples, sleeps, fails, or writes a
/// dummy artifact of a configurable size and extension.
pub(crate) struct MockExtractor {
    /// Size reported by the preflight inspect (None = not reported)
    pub(crate) inspect_size: Option<u64>,
    /// Error returned by inspect instead of a result
    pub(crate) inspect_error: Option<String>,
    /// Sleep inserted into every download call
    pub(crate) download_delay: Duration,
    /// How long a HANG_MARKER url sleeps before giving up
    pub(crate) hang_delay: Duration,
    /// Error returned by download after the delay
    pub(crate) download_error: Option<String>,
    /// Extension of the dummy artifact
    pub(crate) extension: &'static str,
    /// Size of the dummy artifact in bytes
    pub(crate) file_bytes: usize,
    /// Skip writing the artifact (simulates a vanished output file)
    pub(crate) skip_write: bool,
    /// Progress samples streamed before the artifact is written
    pub(crate) progress: Vec<ProgressUpdate>,
    /// Number of inspect invocations
    pub(crate) inspect_calls: Arc<AtomicUsize>,
    /// Number of download invocations
    pub(crate) download_calls: Arc<AtomicUsize>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self {
            inspect_size: None,
            inspect_error: None,
            download_delay: Duration::from_millis(0),
            hang_delay: Duration::from_secs(60),
            download_error: None,
            extension: "mp4",
            file_bytes: 1024,
            skip_write: false,
            progress: Vec::new(),
            inspect_calls: Arc::new(AtomicUsize::new(0)),
            download_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockExtractor {
    pub(crate) fn canned_metadata(url: &str) -> MediaMetadata {
        MediaMetadata {
            title: Some("Test Clip".to_string()),
            uploader: Some("Test Channel".to_string()),
            duration_seconds: Some(42.0),
            view_count: Some(1000),
            upload_date: Some("20240101".to_string()),
            platform: Platform::from_url(url),
        }
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn inspect(&self, request: &ExtractRequest) -> Result<Inspection> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.inspect_error {
            return Err(Error::Extraction(message.clone()));
        }

        Ok(Inspection {
            metadata: Self::canned_metadata(&request.url),
            filesize: self.inspect_size,
        })
    }

    async fn download(
        &self,
        request: &ExtractRequest,
        progress: mpsc::Sender<ProgressUpdate>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);

        for update in &self.progress {
            progress.send(update.clone()).await.ok();
        }

        let delay = if request.url.contains(HANG_MARKER) {
            self.hang_delay
        } else {
            self.download_delay
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Err(Error::Extraction("extraction cancelled".to_string()));
            }
        }

        if let Some(message) = &self.download_error {
            return Err(Error::Extraction(message.clone()));
        }

        if !self.skip_write {
            let path = request.output_stem.with_extension(self.extension);
            tokio::fs::write(&path, vec![0u8; self.file_bytes]).await?;
        }

        Ok(())
    }
}

/// Config pointing at a temp download dir with fast test-friendly bounds.
pub(crate) fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_jobs = 3;
    config.download.job_timeout_secs = 5;
    // The mock never spawns a binary, so no PATH search is needed
    config.extractor.search_path = false;
    config
}

/// Orchestrator with a default mock extractor.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    create_test_downloader_with(MockExtractor::default(), |_| {}).await
}

/// Orchestrator with a custom mock and a config tweak hook.
pub(crate) async fn create_test_downloader_with(
    extractor: MockExtractor,
    configure: impl FnOnce(&mut Config),
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    configure(&mut config);

    let downloader =
        MediaDownloader::with_extractor(config, JobStore::new(), Arc::new(extractor))
            .await
            .unwrap();

    (downloader, temp_dir)
}

/// Poll a job until it reaches a terminal status or the deadline passes.
pub(crate) async fn wait_for_terminal(
    downloader: &MediaDownloader,
    id: crate::types::JobId,
    deadline: Duration,
) -> crate::types::JobRecord {
    let result = tokio::time::timeout(deadline, async {
        loop {
            let record = downloader.status(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    result.expect("job did not reach a terminal status in time")
}
