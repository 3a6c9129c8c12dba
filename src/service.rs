//! Boundary adapter for the external scheduler.
//!
//! Translates the scheduler's raw signals (`notify_start`, `notify_stop`)
//! into controller operations and answers with the booleans the scheduler
//! expects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DispatcherConfig;
use crate::error::Result;
use crate::jobs::{JobId, JobParameters};
use crate::tasks::TaskRegistry;
use crate::worker::{JobController, JobScheduler};

/// Job service facing the external scheduler.
pub struct JobService {
    controller: JobController,
}

impl JobService {
    /// Start a service with its own controller and worker loop.
    pub fn start(
        config: DispatcherConfig,
        registry: TaskRegistry,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self::new(JobController::start(config, registry, scheduler))
    }

    pub fn new(controller: JobController) -> Self {
        Self { controller }
    }

    /// Start signal. `Ok(true)` means the work continues asynchronously and
    /// completion will be reported through the scheduler callback.
    pub fn notify_start(
        &self,
        job_id: JobId,
        extras: Option<HashMap<String, i64>>,
    ) -> Result<bool> {
        if extras.is_none() {
            tracing::warn!(job_id, "Start signal without extras");
        }
        self.controller.on_start(JobParameters { job_id, extras })?;
        Ok(true)
    }

    /// Stop signal. Always answers `true`: the normal completion path
    /// decides what gets reported for the job.
    pub fn notify_stop(&self, job_id: JobId) -> bool {
        let outcome = self.controller.on_stop(job_id);
        tracing::debug!(job_id, ?outcome, "Handled stop signal");
        true
    }

    pub fn controller(&self) -> &JobController {
        &self.controller
    }

    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
