//! JobTable: start-signaled jobs that have not yet been dequeued or cancelled.
//!
//! The table itself is not synchronized. The controller keeps it behind the
//! same lock that guards the current job, so insert/remove/lookup are atomic
//! with respect to start, stop and dequeue.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::jobs::params::{JobId, JobParameters};

/// A queued entry.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub params: JobParameters,
    /// Ticket of the posting that will dequeue this entry.
    pub ticket: u64,
    pub queued_at: DateTime<Utc>,
}

impl QueuedJob {
    pub fn new(params: JobParameters, ticket: u64) -> Self {
        Self {
            params,
            ticket,
            queued_at: Utc::now(),
        }
    }
}

/// Mapping from job id to queued job.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<JobId, QueuedJob>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job. Returns `false`, leaving the existing entry in place,
    /// when the id is already present.
    pub fn insert(&mut self, job_id: JobId, job: QueuedJob) -> bool {
        if self.jobs.contains_key(&job_id) {
            return false;
        }
        self.jobs.insert(job_id, job);
        true
    }

    pub fn remove(&mut self, job_id: JobId) -> Option<QueuedJob> {
        self.jobs.remove(&job_id)
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.contains_key(&job_id)
    }

    pub fn get(&self, job_id: JobId) -> Option<&QueuedJob> {
        self.jobs.get(&job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Queued job ids, ascending.
    pub fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Remove every entry matching `predicate`, returning the removed ids.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<JobId>
    where
        F: FnMut(&QueuedJob) -> bool,
    {
        let mut removed = Vec::new();
        self.jobs.retain(|id, job| {
            if predicate(job) {
                removed.push(*id);
                false
            } else {
                true
            }
        });
        removed.sort_unstable();
        removed
    }

    /// Drop all entries, returning their ids.
    pub fn clear(&mut self) -> Vec<JobId> {
        self.remove_where(|_| true)
    }
}
