//! Activity stream for job lifecycle changes.
//!
//! The controller and worker broadcast a `JobEvent` on every state change.
//! Subscribers that lag behind lose events; the dispatcher never blocks on
//! them.

use serde::{Deserialize, Serialize};

use crate::jobs::params::{JobId, TaskType};
use crate::jobs::state::JobState;

/// How a dequeued job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Task body ran to completion.
    Completed,
    /// Cancellation was requested before the body started.
    Skipped,
    /// Body observed cancellation and stopped early.
    Interrupted,
    /// Body returned an error or panicked.
    Failed { error: String },
    /// No runnable task for the job's task type.
    NoWork,
}

/// Lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Queued {
        job_id: JobId,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_type: Option<TaskType>,
    },
    Started {
        job_id: JobId,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_type: Option<TaskType>,
    },
    /// Queued job withdrawn before dequeue.
    Cancelled { job_id: JobId },
    /// Stop requested for the running job.
    Interrupted { job_id: JobId },
    Finished {
        job_id: JobId,
        outcome: JobOutcome,
        needs_reschedule: bool,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Queued { job_id, .. }
            | Self::Started { job_id, .. }
            | Self::Cancelled { job_id }
            | Self::Interrupted { job_id }
            | Self::Finished { job_id, .. } => *job_id,
        }
    }

    /// State the job enters with this event.
    pub fn state(&self) -> JobState {
        match self {
            Self::Queued { .. } => JobState::Queued,
            Self::Started { .. } => JobState::Running,
            Self::Cancelled { .. } => JobState::Cancelled,
            Self::Interrupted { .. } => JobState::Interrupted,
            Self::Finished { .. } => JobState::Finished,
        }
    }
}
