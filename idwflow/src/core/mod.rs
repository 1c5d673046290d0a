//! Core domain model types for idwflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Stage identity, stage status and the run state machine
//! - The validated analysis request
//! - Stage artifacts, per-stage records and the terminal pipeline result

mod artifact;
mod request;
mod result;
mod stage;
mod status;

pub use artifact::StageArtifact;
pub use request::{AnalysisRequest, K_MAX, K_MIN};
pub use result::{PipelineResult, RunFailure, RunSummary, StageRecord};
pub use stage::{ArtifactKind, StageId};
pub use status::{RunState, StageStatus};
