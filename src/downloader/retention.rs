//! Terminal-record retention sweeper.
//!
//! Without eviction the job store grows without bound over a long-running
//! deployment. The sweeper periodically removes records that have been
//! terminal for longer than the configured TTL, together with their
//! artifacts on disk.

use crate::types::Event;

use super::MediaDownloader;

impl MediaDownloader {
    /// Start the retention sweeper task.
    ///
    /// Spawns a background task that every `sweep_interval`:
    /// 1. Computes the cutoff (`now - ttl`)
    /// 2. Evicts every terminal record whose `finished_at` is older
    /// 3. Deletes evicted artifacts from disk (when configured)
    ///
    /// Returns immediately with the task handle. If retention is disabled
    /// (`ttl_secs = null`) the task exits right away.
    pub fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let config = self.config.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let Some(ttl) = config.retention_ttl() else {
                tracing::info!("Record retention disabled, sweeper exiting");
                return;
            };
            let Ok(ttl) = chrono::Duration::from_std(ttl) else {
                tracing::error!("Retention TTL out of range, sweeper exiting");
                return;
            };

            let mut interval = tokio::time::interval(config.sweep_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let cutoff = chrono::Utc::now() - ttl;
                let evicted = store.evict_terminal_before(cutoff).await;
                if evicted.is_empty() {
                    continue;
                }

                tracing::info!(count = evicted.len(), "Evicted expired job records");

                for record in evicted {
                    if config.retention.delete_artifacts
                        && let Some(result) = &record.result
                        && let Err(e) = tokio::fs::remove_file(&result.path).await
                        && e.kind() != std::io::ErrorKind::NotFound
                    {
                        tracing::warn!(
                            job_id = %record.id,
                            path = %result.path.display(),
                            error = %e,
                            "Failed to delete evicted artifact"
                        );
                    }

                    event_tx.send(Event::Evicted { id: record.id }).ok();
                }
            }
        })
    }
}
