//! Per-job state machine.

use serde::{Deserialize, Serialize};

/// State of a job id as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Start-signaled and waiting in JobTable.
    Queued,
    /// Dequeued and executing on the worker.
    Running,
    /// Running, with a stop requested.
    Interrupted,
    /// Worker reported completion.
    Finished,
    /// Withdrawn before it was dequeued.
    Cancelled,
}

impl JobState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: JobState) -> bool {
        use JobState::*;

        matches!(
            (self, target),
            (Queued, Running) | (Queued, Cancelled) |
            (Running, Interrupted) | (Running, Finished) |
            (Interrupted, Finished)
        )
    }

    /// Terminal ids are absent from all tracking state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_valid() {
        assert!(JobState::Queued.can_transition_to(JobState::Running));
        assert!(JobState::Queued.can_transition_to(JobState::Cancelled));
        assert!(JobState::Running.can_transition_to(JobState::Finished));
        assert!(JobState::Running.can_transition_to(JobState::Interrupted));
        assert!(JobState::Interrupted.can_transition_to(JobState::Finished));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!JobState::Finished.can_transition_to(JobState::Queued));
        assert!(!JobState::Finished.can_transition_to(JobState::Running));
        assert!(!JobState::Cancelled.can_transition_to(JobState::Running));
        assert!(!JobState::Running.can_transition_to(JobState::Cancelled));
        assert!(!JobState::Queued.can_transition_to(JobState::Finished));
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Finished.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Interrupted.is_terminal());
    }

    #[test]
    fn job_state_serde_roundtrip() {
        let json = serde_json::to_string(&JobState::Interrupted).unwrap();
        assert_eq!(json, "\"interrupted\"");
        let parsed: JobState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, JobState::Interrupted);
    }
}
