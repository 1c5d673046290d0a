//! Testing utilities for idwflow pipelines.
//!
//! This module provides:
//! - A recording backend that stands in for the analysis library
//! - A synthetic workspace fixture
//! - Assertions over pipeline results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_artifacts_on_disk, assert_failed_at, assert_rejected, assert_stage_sequence,
    assert_succeeded,
};
pub use fixtures::WorkspaceFixture;
pub use mocks::{BackendCall, RecordingBackend};
