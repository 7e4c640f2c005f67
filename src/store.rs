//! In-memory job registry
//!
//! The job store is the only shared mutable resource in the system. It is a
//! concurrent key-value registry of [`JobRecord`]s behind a single
//! `tokio::sync::RwLock`: many concurrent status readers, writers serialized.
//! Each record has one writer at a time (the owning job's task), so the
//! coarse lock is contention-free in practice.
//!
//! The store is created by the caller and injected into the orchestrator at
//! construction, so multiple independent orchestrator instances can coexist
//! (e.g. in tests) without hidden global state.

use crate::error::{Error, Result};
use crate::types::{JobId, JobRecord, Status};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrent registry of job records, keyed by [`JobId`]
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keyed by its id
    pub async fn insert(&self, record: JobRecord) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(record.id, record);
    }

    /// Get a snapshot of a record
    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).cloned()
    }

    /// Apply a mutation to a record atomically with respect to readers.
    ///
    /// Returns [`Error::JobNotFound`] if the id is unknown. The mutator runs
    /// under the write lock, so readers never observe a half-applied update.
    pub async fn update<F>(&self, id: JobId, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        mutator(record);
        Ok(())
    }

    /// Number of tracked jobs (all statuses, cumulative for process lifetime
    /// minus evictions)
    pub async fn len(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of all records, newest first
    pub async fn list(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().await;
        let mut records: Vec<JobRecord> = jobs.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Number of jobs currently in the given status
    pub async fn count_with_status(&self, status: Status) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values().filter(|r| r.status == status).count()
    }

    /// Remove and return every terminal record that finished before `cutoff`.
    ///
    /// Non-terminal records and records without a `finished_at` timestamp are
    /// never touched. Used by the retention sweeper.
    pub async fn evict_terminal_before(&self, cutoff: DateTime<Utc>) -> Vec<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|r| {
                r.status.is_terminal() && r.finished_at.is_some_and(|finished| finished < cutoff)
            })
            .map(|r| r.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| jobs.remove(&id))
            .collect()
    }
}
