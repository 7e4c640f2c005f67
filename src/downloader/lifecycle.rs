//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::time::Duration;

use super::MediaDownloader;

/// How long shutdown waits for in-flight jobs to reach a terminal state
const SHUTDOWN_WAIT: Duration = Duration::from_secs(30);

impl MediaDownloader {
    /// Gracefully shut down the orchestrator.
    ///
    /// Sequence:
    /// 1. Stop accepting new submissions ([`submit`](Self::submit) returns
    ///    `ShuttingDown` from here on)
    /// 2. Cancel all active jobs via their cancellation tokens; in-flight
    ///    extractions abort and the jobs finalize as failed
    /// 3. Wait for spawned job tasks to finish, bounded by a 30 s timeout
    /// 4. Emit the shutdown event
    ///
    /// Job records stay in the store so late status queries still resolve.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.job_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);

        // Cancel every active job
        {
            let active = self.job_state.active_jobs.lock().await;
            tracing::info!(active_count = active.len(), "Cancelling active jobs");
            for (id, token) in active.iter() {
                tracing::debug!(job_id = %id, "Signaling cancellation");
                token.cancel();
            }
        }

        // Join the job tasks through the tracker
        self.job_state.tasks.close();
        match tokio::time::timeout(SHUTDOWN_WAIT, self.job_state.tasks.wait()).await {
            Ok(()) => tracing::info!("All job tasks finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for job tasks, proceeding with shutdown");
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
