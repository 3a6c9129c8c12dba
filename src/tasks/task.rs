//! Unit-of-work abstraction run by the worker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::jobs::{JobId, TaskType};

/// Per-invocation context handed to a task body.
///
/// The cancellation token is minted when the job is dequeued, so a stop
/// aimed at an earlier job can never be observed here.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub job_id: JobId,
    pub task_type: TaskType,
    pub started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(job_id: JobId, task_type: TaskType, cancel: CancellationToken) -> Self {
        Self {
            job_id,
            task_type,
            started_at: Utc::now(),
            cancel,
        }
    }

    /// Whether a stop has been requested for this job.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once a stop is requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Poll point for cooperative cancellation: `ctx.checkpoint()?`.
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A runnable unit of work.
///
/// Instances must not keep mutable state across invocations that the
/// signal context could observe.
#[async_trait]
pub trait Task: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run the body. Returning `Err(TaskError::Cancelled)` reports that the
    /// body stopped early because of a stop request.
    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError>;
}
