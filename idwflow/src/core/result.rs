//! Per-stage records and the terminal pipeline result.

use super::{RunState, StageArtifact, StageId, StageStatus};
use crate::errors::{AnalysisError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one stage during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage identity.
    pub stage: StageId,
    /// Final status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// The artifact written, if the stage completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<StageArtifact>,
    /// Error message if the stage failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageRecord {
    /// Creates a completed stage record.
    #[must_use]
    pub fn completed(
        stage: StageId,
        started_at: DateTime<Utc>,
        duration_ms: f64,
        artifact: StageArtifact,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            started_at,
            ended_at: Utc::now(),
            duration_ms,
            artifact: Some(artifact),
            error: None,
        }
    }

    /// Creates a failed stage record.
    #[must_use]
    pub fn failed(
        stage: StageId,
        started_at: DateTime<Utc>,
        duration_ms: f64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Fail,
            started_at,
            ended_at: Utc::now(),
            duration_ms,
            artifact: None,
            error: Some(error.into()),
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of a run in which all five stages completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// The power exponent used.
    pub k: u32,
    /// The exported map image.
    pub image_path: PathBuf,
    /// One artifact per stage, in execution order.
    pub artifacts: Vec<StageArtifact>,
    /// One record per stage, in execution order.
    pub stages: Vec<StageRecord>,
    /// Total run duration in milliseconds.
    pub duration_ms: f64,
}

/// Outcome of a run that stopped at a failing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    /// Run identifier.
    pub run_id: Uuid,
    /// The power exponent used.
    pub k: u32,
    /// The failure raised by the stage.
    pub error: AnalysisError,
    /// Records of the completed stages followed by the failed one.
    pub stages: Vec<StageRecord>,
    /// Total run duration in milliseconds.
    pub duration_ms: f64,
}

/// Terminal result of [`crate::pipeline::Pipeline::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PipelineResult {
    /// All five stages completed.
    Succeeded(RunSummary),
    /// The input was rejected before any stage ran.
    Rejected(ValidationError),
    /// A stage failed; later stages never ran.
    Failed(RunFailure),
}

impl PipelineResult {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns true if the input was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns true if a stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the terminal run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Succeeded(_) => RunState::Succeeded,
            Self::Rejected(_) => RunState::Rejected,
            Self::Failed(_) => RunState::Failed,
        }
    }

    /// Returns the exported image path on success.
    #[must_use]
    pub fn image_path(&self) -> Option<&Path> {
        match self {
            Self::Succeeded(summary) => Some(&summary.image_path),
            _ => None,
        }
    }

    /// Returns the stage that failed, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            Self::Failed(failure) => Some(failure.error.stage),
            _ => None,
        }
    }

    /// Returns the stage records of the run; empty when rejected.
    #[must_use]
    pub fn stages(&self) -> &[StageRecord] {
        match self {
            Self::Succeeded(summary) => &summary.stages,
            Self::Failed(failure) => &failure.stages,
            Self::Rejected(_) => &[],
        }
    }

    /// Returns a human-readable status line for the shell.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded(summary) => {
                format!("Process completed: {}", summary.image_path.display())
            }
            Self::Rejected(err) => err.to_string(),
            Self::Failed(failure) => failure.error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(stage: StageId) -> PipelineResult {
        PipelineResult::Failed(RunFailure {
            run_id: Uuid::new_v4(),
            k: 4,
            error: AnalysisError::new(stage, "boom"),
            stages: vec![StageRecord::failed(stage, Utc::now(), 1.0, "boom")],
            duration_ms: 1.0,
        })
    }

    #[test]
    fn test_rejected_result() {
        let result = PipelineResult::Rejected(ValidationError::Empty { min: 2, max: 30 });
        assert!(result.is_rejected());
        assert_eq!(result.state(), RunState::Rejected);
        assert!(result.stages().is_empty());
        assert!(result.image_path().is_none());
        assert!(result.message().contains("2 - 30"));
    }

    #[test]
    fn test_failed_result() {
        let result = failure(StageId::Join);
        assert!(result.is_failed());
        assert_eq!(result.failed_stage(), Some(StageId::Join));
        assert_eq!(result.state(), RunState::Failed);
        assert_eq!(result.message(), "join stage failed: boom");
        assert_eq!(result.stages().len(), 1);
        assert!(!result.stages()[0].is_success());
    }

    #[test]
    fn test_result_serialization_is_tagged() {
        let result = PipelineResult::Rejected(ValidationError::OutOfRange {
            raw: "31".to_string(),
            min: 2,
            max: 30,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["detail"]["reason"], "out_of_range");
        assert_eq!(json["detail"]["raw"], "31");
    }
}
