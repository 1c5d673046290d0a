//! Pipeline lifecycle events.
//!
//! The orchestrator reports progress exclusively through an [`EventSink`];
//! it never talks to a user interface directly.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A lifecycle event of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A valid request was accepted and the first stage is about to run.
    #[serde(rename = "pipeline.started")]
    PipelineStarted {
        /// Run identifier.
        run_id: Uuid,
        /// Power exponent.
        k: u32,
    },
    /// A stage began.
    #[serde(rename = "stage.started")]
    StageStarted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageId,
    },
    /// A stage wrote its artifact.
    #[serde(rename = "stage.completed")]
    StageCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageId,
        /// The artifact written.
        artifact: PathBuf,
        /// Stage duration in milliseconds.
        duration_ms: f64,
    },
    /// A stage failed.
    #[serde(rename = "stage.failed")]
    StageFailed {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageId,
        /// The library diagnostic.
        message: String,
        /// Stage duration in milliseconds.
        duration_ms: f64,
    },
    /// All five stages completed.
    #[serde(rename = "pipeline.succeeded")]
    PipelineSucceeded {
        /// Run identifier.
        run_id: Uuid,
        /// The exported image.
        image_path: PathBuf,
        /// Run duration in milliseconds.
        duration_ms: f64,
    },
    /// The run stopped at a failing stage.
    #[serde(rename = "pipeline.failed")]
    PipelineFailed {
        /// Run identifier.
        run_id: Uuid,
        /// The failing stage.
        stage: StageId,
        /// The library diagnostic.
        message: String,
    },
    /// The raw input was rejected; nothing ran.
    #[serde(rename = "pipeline.rejected")]
    PipelineRejected {
        /// The rejected input.
        raw: String,
        /// Why it was rejected.
        message: String,
    },
}

impl PipelineEvent {
    /// Returns the dotted event type, e.g. `"stage.completed"`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::PipelineSucceeded { .. } => "pipeline.succeeded",
            Self::PipelineFailed { .. } => "pipeline.failed",
            Self::PipelineRejected { .. } => "pipeline.rejected",
        }
    }

    /// Returns the stage the event concerns, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::StageStarted { stage, .. }
            | Self::StageCompleted { stage, .. }
            | Self::StageFailed { stage, .. }
            | Self::PipelineFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the event as a JSON object including its `type`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Returns the coarse status a shell displays, if the event has one.
    #[must_use]
    pub fn shell_status(&self) -> Option<ShellStatus> {
        match self {
            Self::PipelineStarted { .. } => Some(ShellStatus::Started),
            Self::PipelineSucceeded { image_path, .. } => {
                Some(ShellStatus::Succeeded(image_path.clone()))
            }
            Self::PipelineFailed { stage, message, .. } => Some(ShellStatus::Failed(format!(
                "{stage} stage failed: {message}"
            ))),
            Self::PipelineRejected { message, .. } => Some(ShellStatus::Failed(message.clone())),
            _ => None,
        }
    }
}

/// What a user-facing shell shows for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellStatus {
    /// The run began.
    Started,
    /// The run finished; the image is at this path.
    Succeeded(PathBuf),
    /// The run stopped with this message.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_type_matches_serialized_tag() {
        let run_id = Uuid::new_v4();
        let events = [
            PipelineEvent::PipelineStarted { run_id, k: 2 },
            PipelineEvent::StageStarted {
                run_id,
                stage: StageId::Join,
            },
            PipelineEvent::StageFailed {
                run_id,
                stage: StageId::Join,
                message: "x".to_string(),
                duration_ms: 1.0,
            },
            PipelineEvent::PipelineRejected {
                raw: "0".to_string(),
                message: "m".to_string(),
            },
        ];
        for event in events {
            assert_eq!(event.to_json()["type"], event.event_type());
        }
    }

    #[test]
    fn test_stage_completed_payload() {
        let event = PipelineEvent::StageCompleted {
            run_id: Uuid::nil(),
            stage: StageId::Interpolate,
            artifact: PathBuf::from("/ws/idwout.asc"),
            duration_ms: 12.5,
        };
        let json = event.to_json();
        assert_eq!(json["stage"], "interpolate");
        assert_eq!(json["artifact"], "/ws/idwout.asc");
        assert_eq!(event.stage(), Some(StageId::Interpolate));
    }

    #[test]
    fn test_shell_status() {
        let run_id = Uuid::nil();
        assert_eq!(
            PipelineEvent::PipelineStarted { run_id, k: 5 }.shell_status(),
            Some(ShellStatus::Started)
        );
        assert_eq!(
            PipelineEvent::PipelineFailed {
                run_id,
                stage: StageId::Aggregate,
                message: "Field 'GEOID10' not found in cancer_tracts".to_string(),
            }
            .shell_status(),
            Some(ShellStatus::Failed(
                "aggregate stage failed: Field 'GEOID10' not found in cancer_tracts".to_string()
            ))
        );
        assert_eq!(
            PipelineEvent::StageStarted {
                run_id,
                stage: StageId::Render
            }
            .shell_status(),
            None
        );
    }
}
