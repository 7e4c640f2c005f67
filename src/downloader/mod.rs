//! Core orchestrator implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`job_task`] - Job execution (admission, preflight, download, finalize)
//! - [`lifecycle`] - Shutdown coordination
//! - [`retention`] - Terminal-record eviction sweeper

mod job_task;
mod lifecycle;
mod retention;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{Extractor, YtDlpExtractor};
use crate::store::JobStore;
use crate::types::{Event, JobId, JobOptions, JobRecord, PlatformInfo};

/// Admission and active-job state management
#[derive(Clone)]
pub(crate) struct JobState {
    /// Semaphore bounding concurrently executing extractions
    /// (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Map of active jobs to their cancellation tokens (timeout and shutdown
    /// cancellation)
    pub(crate) active_jobs: std::sync::Arc<
        tokio::sync::Mutex<std::collections::HashMap<JobId, tokio_util::sync::CancellationToken>>,
    >,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Tracker for spawned job tasks; the join point for graceful shutdown
    pub(crate) tasks: tokio_util::task::TaskTracker,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
///
/// Accepts job submissions, runs them under the admission gate with a
/// per-job deadline, keeps the injected [`JobStore`] current from extractor
/// progress callbacks, and classifies terminal outcomes. Submission is
/// fire-and-forget; callers observe jobs through [`status`](Self::status)
/// or the event stream.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Job store holding every tracked record.
    /// Public for integration tests to query job state directly.
    pub store: JobStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Extraction capability (trait object for pluggable engines)
    pub(crate) extractor: std::sync::Arc<dyn Extractor>,
    /// Admission and active-job state
    pub(crate) job_state: JobState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance with the yt-dlp extractor.
    ///
    /// This initializes all core components:
    /// - Ensures the download directory exists
    /// - Resolves the yt-dlp binary (explicit path or PATH search)
    /// - Creates a fresh job store and the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        let extractor = YtDlpExtractor::from_config(&config.extractor)?;
        Self::with_extractor(config, JobStore::new(), std::sync::Arc::new(extractor)).await
    }

    /// Create a MediaDownloader with an injected store and extractor.
    ///
    /// The store is owned by the caller and passed in explicitly, so
    /// multiple independent orchestrator instances can coexist and tests can
    /// substitute the extraction engine.
    pub async fn with_extractor(
        config: Config,
        store: JobStore,
        extractor: std::sync::Arc<dyn Extractor>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        // Broadcast channel with a generous buffer; slow subscribers lag
        // rather than block job execution
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let job_state = JobState {
            concurrent_limit: std::sync::Arc::new(tokio::sync::Semaphore::new(
                config.download.max_concurrent_jobs,
            )),
            active_jobs: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            tasks: tokio_util::task::TaskTracker::new(),
        };

        tracing::info!(
            extractor = extractor.name(),
            max_concurrent = config.download.max_concurrent_jobs,
            timeout_secs = config.download.job_timeout_secs,
            "Orchestrator initialized"
        );

        Ok(Self {
            store,
            event_tx,
            config: std::sync::Arc::new(config),
            extractor,
            job_state,
        })
    }

    /// Submit a new download job.
    ///
    /// Creates a job record in the `queued` state, schedules asynchronous
    /// execution, and returns the new job id immediately without blocking on
    /// extraction. The spawned task is registered with the internal task
    /// tracker, which serves as the join point during shutdown.
    ///
    /// The orchestrator performs no URL validation; rejecting unsupported
    /// URLs is the transport layer's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has
    /// been initiated.
    pub async fn submit(&self, url: impl Into<String>, options: JobOptions) -> Result<JobId> {
        if !self
            .job_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        let url = url.into();
        let id = JobId::new();
        let record = JobRecord::new(id, url.clone(), options);
        self.store.insert(record).await;

        tracing::info!(job_id = %id, url = %url, "Job queued");
        self.emit_event(Event::Queued { id });

        let cancel_token = tokio_util::sync::CancellationToken::new();
        {
            let mut active = self.job_state.active_jobs.lock().await;
            active.insert(id, cancel_token.clone());
        }

        let ctx = job_task::JobTaskContext {
            id,
            store: self.store.clone(),
            config: self.config.clone(),
            extractor: self.extractor.clone(),
            event_tx: self.event_tx.clone(),
            concurrent_limit: self.job_state.concurrent_limit.clone(),
            active_jobs: self.job_state.active_jobs.clone(),
            cancel_token,
        };

        // Explicit task handle; the public contract discards it, but the
        // tracker keeps the join/cancellation point for shutdown
        let _handle = self.job_state.tasks.spawn(job_task::run_job(ctx));

        Ok(id)
    }

    /// Get a snapshot of a job record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobNotFound`] for an identity that was never
    /// submitted (or has been evicted by the retention sweeper).
    pub async fn status(&self, id: JobId) -> Result<JobRecord> {
        self.store.get(id).await.ok_or(Error::JobNotFound(id))
    }

    /// Snapshot of all tracked jobs, newest first
    pub async fn list_jobs(&self) -> Vec<JobRecord> {
        self.store.list().await
    }

    /// Number of tracked jobs (queued + processing + terminal)
    pub async fn job_count(&self) -> usize {
        self.store.len().await
    }

    /// Supported platforms and their feature tags (static data)
    pub fn capabilities(&self) -> Vec<PlatformInfo> {
        crate::types::supported_platforms()
    }

    /// Subscribe to job lifecycle events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls behind by more than the
    /// channel buffer receives a `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration (cheap Arc clone)
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// job execution never depends on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task.
    ///
    /// The server runs concurrently with job processing and listens on the
    /// configured bind address (default: 127.0.0.1:8090).
    pub fn spawn_api_server(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
