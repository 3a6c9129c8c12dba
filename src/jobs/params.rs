//! Job descriptors as delivered by the external scheduler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of one outstanding scheduled invocation.
pub type JobId = i32;

/// Code selecting which registered task a job runs.
pub type TaskType = i32;

/// Extras key carrying the task-type code.
pub const TASK_TYPE_KEY: &str = "task-type";

/// Task-type code meaning "no task".
pub const NO_TASK: TaskType = 0;

/// Payload attached to a start signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    pub job_id: JobId,
    /// Opaque extras; `None` when the scheduler attached nothing.
    pub extras: Option<HashMap<String, i64>>,
}

impl JobParameters {
    pub fn new(job_id: JobId, extras: HashMap<String, i64>) -> Self {
        Self {
            job_id,
            extras: Some(extras),
        }
    }

    /// Descriptor whose extras carry only a task-type code.
    pub fn for_task(job_id: JobId, task_type: TaskType) -> Self {
        Self::new(
            job_id,
            HashMap::from([(TASK_TYPE_KEY.to_string(), i64::from(task_type))]),
        )
    }

    /// Descriptor without extras.
    pub fn bare(job_id: JobId) -> Self {
        Self {
            job_id,
            extras: None,
        }
    }

    /// The task-type code, if the extras carry a usable one.
    pub fn task_type(&self) -> Option<TaskType> {
        let raw = *self.extras.as_ref()?.get(TASK_TYPE_KEY)?;
        TaskType::try_from(raw).ok().filter(|code| *code != NO_TASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_read_from_extras() {
        assert_eq!(JobParameters::for_task(3, -1).task_type(), Some(-1));
    }

    #[test]
    fn missing_extras_have_no_task_type() {
        assert_eq!(JobParameters::bare(3).task_type(), None);
    }

    #[test]
    fn missing_key_has_no_task_type() {
        let params = JobParameters::new(3, HashMap::from([("other".to_string(), 5)]));
        assert_eq!(params.task_type(), None);
    }

    #[test]
    fn zero_code_means_no_task() {
        assert_eq!(JobParameters::for_task(3, NO_TASK).task_type(), None);
    }

    #[test]
    fn out_of_range_code_is_ignored() {
        let params = JobParameters::new(
            3,
            HashMap::from([(TASK_TYPE_KEY.to_string(), i64::from(i32::MAX) + 1)]),
        );
        assert_eq!(params.task_type(), None);
    }
}
