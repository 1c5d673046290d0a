//! # idwflow
//!
//! A fixed five-stage geospatial analysis pipeline driven by a single
//! integer parameter, the IDW power exponent `k`.
//!
//! The pipeline interpolates well nitrate samples onto a surface, summarises
//! the surface per census tract, joins the summary back onto the tracts,
//! regresses the tract mean against the cancer rate and renders the result
//! to a map image.
//!
//! - **Orchestration**: [`pipeline::Pipeline`] validates `k` and runs the
//!   stages strictly in order, threading each artifact into the next stage
//! - **Analysis seam**: [`analysis::AnalysisBackend`] abstracts the five
//!   geoprocessing operations; [`analysis::NativeBackend`] implements them
//! - **Observability**: lifecycle events flow through an [`events::EventSink`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use idwflow::prelude::*;
//!
//! let workspace = WorkspaceContext::open("idw_output")?;
//! let pipeline = Pipeline::new(workspace, NativeBackend::new());
//!
//! match pipeline.run("2") {
//!     PipelineResult::Succeeded(summary) => println!("{}", summary.image_path.display()),
//!     other => eprintln!("{}", other.message()),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub mod analysis;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{AnalysisBackend, NativeBackend};
    pub use crate::core::{
        AnalysisRequest, ArtifactKind, PipelineResult, RunFailure, RunState, RunSummary,
        StageArtifact, StageId, StageRecord, StageStatus,
    };
    pub use crate::errors::{AnalysisError, ConfigError, GeoError, ValidationError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent};
    pub use crate::pipeline::Pipeline;
    pub use crate::workspace::{AnalysisSettings, ArtifactLayout, WorkspaceContext};
}
