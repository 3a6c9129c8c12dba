//! Completion callback into the external scheduler.

use crate::jobs::JobId;

/// The external scheduler's side of the boundary.
///
/// Called from the worker context once per dequeued job, after the
/// controller has cleared its current job. Jobs withdrawn while queued are
/// never reported.
pub trait JobScheduler: Send + Sync {
    fn report_finished(&self, job_id: JobId, needs_reschedule: bool);
}

impl<F> JobScheduler for F
where
    F: Fn(JobId, bool) + Send + Sync,
{
    fn report_finished(&self, job_id: JobId, needs_reschedule: bool) {
        self(job_id, needs_reschedule)
    }
}
