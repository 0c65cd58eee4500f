// Background Job Status State Machine

use serde::{Deserialize, Serialize};

/// Status of a Background Job
///
/// `created -> [queued ->] preparing -> running -> {completed | failed | canceled}`.
/// `canceled` is also reachable from every active state; the three outcome
/// states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Created,
    Queued,
    Preparing,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    /// States a session-wide cancellation sweep applies to
    pub const ACTIVE: [JobStatus; 4] = [
        JobStatus::Created,
        JobStatus::Queued,
        JobStatus::Preparing,
        JobStatus::Running,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self -> next` is a legal edge
    ///
    /// `failed -> queued` is not listed here: it is only taken by the retry
    /// scheduling helper.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Completed | Failed | Canceled, _) => false,
            (_, Canceled) | (_, Failed) => true,
            (Created, Queued) | (Created, Preparing) => true,
            (Queued, Preparing) => true,
            // setup can report progress more than once
            (Preparing, Preparing) | (Preparing, Running) => true,
            (Running, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Preparing => "preparing",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "queued" => Ok(JobStatus::Queued),
            "preparing" => Ok(JobStatus::Preparing),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            other => Err(crate::domain::DomainError::ValidationError(format!(
                "Unknown job status: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_happy_path_edges() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Preparing));
        assert!(JobStatus::Preparing.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_terminal_states_are_sinks() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Canceled] {
            assert!(terminal.is_terminal());
            for next in [
                JobStatus::Created,
                JobStatus::Queued,
                JobStatus::Preparing,
                JobStatus::Running,
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Canceled,
            ] {
                assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
            }
        }
    }

    #[test]
    fn test_cancel_from_every_active_state() {
        for state in JobStatus::ACTIVE {
            assert!(state.can_transition_to(JobStatus::Canceled));
        }
    }

    #[test]
    fn test_skipping_running_is_illegal() {
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Created.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Preparing));
    }

    #[test]
    fn test_string_round_trip() {
        assert_eq!(JobStatus::from_str("canceled").unwrap(), JobStatus::Canceled);
        assert_eq!(JobStatus::Preparing.to_string(), "preparing");
        assert!(JobStatus::from_str("CANCELLED").is_err());
    }
}
