//! Job execution — admission, preflight, download, artifact resolution,
//! finalization.
//!
//! One `run_job` invocation per submitted job. The whole extraction
//! (inspect + download) runs under a single wall-clock timeout so a hung
//! extraction can never hold an admission permit indefinitely, and the
//! permit itself is bound to the task scope so it is released on every
//! outcome.

use crate::artifact;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{ExtractRequest, Extractor, format::format_expression};
use crate::store::JobStore;
use crate::types::{
    Event, FailureKind, JobFailure, JobId, JobResult, Platform, ProgressUpdate, Status,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Buffer for extractor progress samples; overflow drops samples rather
/// than stalling the extraction
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Everything one job task needs, captured at submission time
pub(crate) struct JobTaskContext {
    pub(crate) id: JobId,
    pub(crate) store: JobStore,
    pub(crate) config: Arc<Config>,
    pub(crate) extractor: Arc<dyn Extractor>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) concurrent_limit: Arc<Semaphore>,
    pub(crate) active_jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    pub(crate) cancel_token: CancellationToken,
}

/// Execute one job from admission to terminal state.
pub(crate) async fn run_job(ctx: JobTaskContext) {
    // Acquire an admission permit (may wait behind other jobs). The permit
    // lives until this function returns, so release is unconditional across
    // every completion and failure path.
    let permit = match ctx.concurrent_limit.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            // Semaphore closed — the process is tearing down
            ctx.active_jobs.lock().await.remove(&ctx.id);
            return;
        }
    };

    mark_processing(&ctx).await;

    let timeout = ctx.config.job_timeout();
    let outcome = match tokio::time::timeout(timeout, execute(&ctx)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            // Kill the in-flight extraction. The terminal-state guard in the
            // progress forwarder keeps any late callbacks from touching the
            // record once it fails below.
            ctx.cancel_token.cancel();
            Err(Error::Timeout {
                seconds: ctx.config.download.job_timeout_secs,
            })
        }
    };

    match outcome {
        Ok(result) => finalize_completed(&ctx, result).await,
        Err(error) => finalize_failed(&ctx, error).await,
    }

    ctx.active_jobs.lock().await.remove(&ctx.id);
    drop(permit);
}

/// Transition the record to `processing` and stamp the start time.
async fn mark_processing(ctx: &JobTaskContext) {
    let update = ctx
        .store
        .update(ctx.id, |record| {
            record.status = Status::Processing;
            record.message = "Starting download".to_string();
            record.started_at = Some(Utc::now());
        })
        .await;

    if let Err(e) = update {
        tracing::error!(job_id = %ctx.id, error = %e, "Failed to mark job as processing");
        return;
    }

    tracing::debug!(job_id = %ctx.id, "Job admitted");
    ctx.event_tx.send(Event::Started { id: ctx.id }).ok();
}

/// The extraction body wrapped by the timeout: preflight, download with
/// live progress, artifact resolution, size validation.
async fn execute(ctx: &JobTaskContext) -> Result<JobResult> {
    let record = ctx
        .store
        .get(ctx.id)
        .await
        .ok_or(Error::JobNotFound(ctx.id))?;

    let platform = Platform::from_url(&record.url);
    let request = ExtractRequest {
        url: record.url.clone(),
        format: format_expression(&record.options, platform).to_string(),
        output_stem: ctx.config.download_dir().join(ctx.id.to_string()),
        socket_timeout: ctx.config.socket_timeout(),
        retries: ctx.config.extractor.retries,
    };

    // Preflight: inspect before committing bandwidth to the download
    let inspection = ctx.extractor.inspect(&request).await?;
    let limit = ctx.config.download.max_file_size_bytes;
    if let Some(size) = inspection.filesize
        && size > limit
    {
        return Err(Error::SizeExceeded {
            size_bytes: size,
            limit_bytes: limit,
        });
    }

    ctx.store
        .update(ctx.id, |record| {
            record.message = "Downloading media".to_string();
            record.total_bytes = inspection.filesize;
        })
        .await?;

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let forwarder = tokio::spawn(forward_progress(
        ctx.store.clone(),
        ctx.event_tx.clone(),
        ctx.id,
        progress_rx,
    ));

    let download_result = ctx
        .extractor
        .download(&request, progress_tx, ctx.cancel_token.clone())
        .await;

    // The sender side is gone once download returns; the forwarder drains
    // the channel and exits on its own
    forwarder.await.ok();
    download_result?;

    let located = artifact::locate(ctx.id, ctx.config.download_dir())
        .await
        .ok_or_else(|| Error::ArtifactNotFound {
            id: ctx.id,
            dir: ctx.config.download_dir().clone(),
        })?;

    // Post-download size check: the preflight size can be absent or
    // under-reported, so the bound is enforced against the real file too
    if located.size_bytes > limit {
        tokio::fs::remove_file(&located.path).await.ok();
        return Err(Error::SizeExceeded {
            size_bytes: located.size_bytes,
            limit_bytes: limit,
        });
    }

    let stored_filename = located
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ctx.id.to_string());
    let download_filename = artifact::derive_filename(&inspection.metadata, &located.path);

    Ok(JobResult {
        path: located.path,
        size_bytes: located.size_bytes,
        stored_filename,
        download_filename,
        metadata: inspection.metadata,
    })
}

/// Merge extractor progress samples into the job record and re-broadcast
/// them as events.
///
/// Runs as its own task so a burst of samples never blocks the extraction;
/// ends when the extractor drops its sender.
async fn forward_progress(
    store: JobStore,
    event_tx: broadcast::Sender<Event>,
    id: JobId,
    mut rx: mpsc::Receiver<ProgressUpdate>,
) {
    while let Some(update) = rx.recv().await {
        let mut applied = false;
        let result = store
            .update(id, |record| {
                // A timed-out job is already terminal; late callbacks must
                // not resurrect it
                if record.status.is_terminal() {
                    return;
                }
                record.progress = Some(update.progress.clone());
                record.speed = update.speed.clone();
                record.eta = update.eta.clone();
                if update.downloaded_bytes.is_some() {
                    record.downloaded_bytes = update.downloaded_bytes;
                }
                if update.total_bytes.is_some() {
                    record.total_bytes = update.total_bytes;
                }
                applied = true;
            })
            .await;

        if result.is_ok() && applied {
            event_tx
                .send(Event::Progress {
                    id,
                    progress: update.progress,
                    speed: update.speed,
                    eta: update.eta,
                })
                .ok();
        }
    }
}

/// Record a successful outcome and announce it.
async fn finalize_completed(ctx: &JobTaskContext, result: JobResult) {
    let path = result.path.clone();
    let size_bytes = result.size_bytes;

    let update = ctx
        .store
        .update(ctx.id, |record| {
            record.status = Status::Completed;
            record.message = "Download completed successfully".to_string();
            record.finished_at = Some(Utc::now());
            record.progress = Some("100%".to_string());
            record.result = Some(result);
        })
        .await;

    if let Err(e) = update {
        tracing::error!(job_id = %ctx.id, error = %e, "Failed to finalize completed job");
        return;
    }

    tracing::info!(
        job_id = %ctx.id,
        path = %path.display(),
        size_bytes,
        "Job completed"
    );
    ctx.event_tx
        .send(Event::Completed {
            id: ctx.id,
            path,
            size_bytes,
        })
        .ok();
}

/// Record a classified failure and announce it.
async fn finalize_failed(ctx: &JobTaskContext, error: Error) {
    let kind = error.failure_kind().unwrap_or(FailureKind::ExtractionFailed);
    let message = error.to_string();

    tracing::warn!(
        job_id = %ctx.id,
        kind = kind.as_str(),
        error = %message,
        "Job failed"
    );

    let update = ctx
        .store
        .update(ctx.id, |record| {
            record.status = Status::Failed;
            record.message = format!("Download failed: {message}");
            record.finished_at = Some(Utc::now());
            record.error = Some(JobFailure {
                kind,
                message: message.clone(),
            });
        })
        .await;

    if let Err(e) = update {
        tracing::error!(job_id = %ctx.id, error = %e, "Failed to finalize failed job");
    }

    ctx.event_tx
        .send(Event::Failed {
            id: ctx.id,
            kind,
            error: message,
        })
        .ok();
}
