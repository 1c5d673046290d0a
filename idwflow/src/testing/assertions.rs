//! Assertions over pipeline results.

use crate::core::{PipelineResult, RunFailure, RunSummary, StageId, StageRecord, StageStatus};
use crate::errors::ValidationError;

/// Asserts that the run succeeded and returns its summary.
pub fn assert_succeeded(result: &PipelineResult) -> &RunSummary {
    match result {
        PipelineResult::Succeeded(summary) => summary,
        other => panic!("Expected success, got: {}", other.message()),
    }
}

/// Asserts that the input was rejected and returns the reason.
pub fn assert_rejected(result: &PipelineResult) -> &ValidationError {
    match result {
        PipelineResult::Rejected(err) => err,
        other => panic!("Expected rejection, got state {}", other.state()),
    }
}

/// Asserts that the run failed at `stage` and returns the failure.
pub fn assert_failed_at(result: &PipelineResult, stage: StageId) -> &RunFailure {
    match result {
        PipelineResult::Failed(failure) => {
            assert_eq!(
                failure.error.stage, stage,
                "Expected failure at {stage}, got: {}",
                failure.error
            );
            failure
        }
        other => panic!("Expected failure at {stage}, got state {}", other.state()),
    }
}

/// Asserts that `records` cover exactly `expected`, in order, and that
/// every record but possibly the last one completed.
pub fn assert_stage_sequence(records: &[StageRecord], expected: &[StageId]) {
    let actual: Vec<StageId> = records.iter().map(|r| r.stage).collect();
    assert_eq!(actual, expected, "Unexpected stage sequence");

    if let Some((_, completed)) = records.split_last() {
        for record in completed {
            assert_eq!(
                record.status,
                StageStatus::Ok,
                "Stage {} did not complete",
                record.stage
            );
        }
    }
}

/// Asserts that every artifact of `summary` exists on disk.
pub fn assert_artifacts_on_disk(summary: &RunSummary) {
    assert_eq!(summary.artifacts.len(), StageId::ALL.len());
    for artifact in &summary.artifacts {
        assert!(
            artifact.path.is_file(),
            "Artifact of {} missing: {}",
            artifact.stage,
            artifact.path.display()
        );
    }
}
