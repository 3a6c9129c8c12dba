//! Error types for the job dispatcher.

use crate::jobs::JobId;

/// Errors surfaced synchronously to the signal context.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The external scheduler delivered a second start signal for a job id
    /// that is still queued. JobTable is left untouched.
    #[error("Job id is not unique: {job_id} is already queued")]
    DuplicateJob { job_id: JobId },

    #[error("Dispatcher is shutting down, rejected start of job {job_id}")]
    ShuttingDown { job_id: JobId },
}

/// Task body failures. Contained by the worker, never propagated to the
/// signal context.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("Task {task} failed: {reason}")]
    Failed { task: String, reason: String },

    #[error("Task cancelled")]
    Cancelled,
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for the dispatcher.
pub type Result<T> = std::result::Result<T, DispatchError>;
