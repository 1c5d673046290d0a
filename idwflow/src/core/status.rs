//! Stage status and the run state machine.

use super::StageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a single stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started.
    #[default]
    Pending,
    /// Stage is currently running.
    Running,
    /// Stage completed and wrote its artifact.
    Ok,
    /// Stage failed.
    Fail,
    /// Stage never ran because an earlier stage failed.
    Skip,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Ok => write!(f, "ok"),
            Self::Fail => write!(f, "fail"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Fail | Self::Skip)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// State of one pipeline run.
///
/// `Idle -> Validating -> {Rejected | Running(1..5) -> {Succeeded | Failed}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run in progress.
    #[default]
    Idle,
    /// Checking the raw input.
    Validating,
    /// Input rejected; no stage ran.
    Rejected,
    /// The given stage is executing.
    Running(StageId),
    /// All five stages completed.
    Succeeded,
    /// A stage failed.
    Failed,
}

impl RunState {
    /// Returns true for `Rejected`, `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Succeeded | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (*self, next) {
            (Self::Idle, Self::Validating)
            | (Self::Validating, Self::Rejected | Self::Running(StageId::Interpolate))
            | (Self::Running(_), Self::Failed)
            | (Self::Running(StageId::Render), Self::Succeeded) => true,
            (Self::Running(current), Self::Running(following)) => {
                current.next() == Some(following)
            }
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Rejected => write!(f, "rejected"),
            Self::Running(stage) => write!(f, "running({stage})"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Ok.to_string(), "ok");
        assert_eq!(StageStatus::Fail.to_string(), "fail");
        assert_eq!(StageStatus::Skip.to_string(), "skip");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Ok.is_terminal());
        assert!(StageStatus::Skip.is_terminal());
        assert!(StageStatus::Fail.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut state = RunState::Idle;
        let mut path = vec![RunState::Validating];
        path.extend(StageId::ALL.iter().map(|s| RunState::Running(*s)));
        path.push(RunState::Succeeded);

        for next in path {
            assert!(state.can_transition_to(next), "{state} -> {next}");
            state = next;
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunState::Idle.can_transition_to(RunState::Running(StageId::Interpolate)));
        assert!(!RunState::Validating.can_transition_to(RunState::Running(StageId::Join)));
        assert!(!RunState::Running(StageId::Interpolate)
            .can_transition_to(RunState::Running(StageId::Join)));
        assert!(!RunState::Running(StageId::Regress).can_transition_to(RunState::Succeeded));
        assert!(!RunState::Rejected.can_transition_to(RunState::Validating));
        assert!(!RunState::Succeeded.can_transition_to(RunState::Idle));
    }

    #[test]
    fn test_any_running_stage_can_fail() {
        for stage in StageId::ALL {
            assert!(RunState::Running(stage).can_transition_to(RunState::Failed));
        }
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Running(StageId::Join).to_string(), "running(join)");
        assert_eq!(RunState::Rejected.to_string(), "rejected");
    }
}
