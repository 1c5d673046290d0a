//! Stage trait and the five analysis stages.
//!
//! A stage turns the run's request, the workspace and the previous stage's
//! artifact into one call on the [`AnalysisBackend`]. Stages hold no state;
//! everything they need arrives through the [`StageContext`].

mod analysis;

pub use analysis::{AggregateStage, InterpolateStage, JoinStage, RegressStage, RenderStage};

use crate::analysis::AnalysisBackend;
use crate::core::{AnalysisRequest, StageId};
use crate::errors::GeoResult;
use crate::workspace::WorkspaceContext;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Everything a stage sees while it runs.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    /// The validated request of this run.
    pub request: &'a AnalysisRequest,
    /// The workspace.
    pub workspace: &'a WorkspaceContext,
    /// The analysis library.
    pub backend: &'a dyn AnalysisBackend,
    /// Artifact written by the preceding stage, if any.
    pub previous: Option<&'a Path>,
}

impl Debug for StageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.request.run_id())
            .field("k", &self.request.k())
            .field("workspace", &self.workspace.workspace_directory())
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

impl<'a> StageContext<'a> {
    /// Creates a context for the first stage.
    #[must_use]
    pub fn new(
        request: &'a AnalysisRequest,
        workspace: &'a WorkspaceContext,
        backend: &'a dyn AnalysisBackend,
    ) -> Self {
        Self {
            request,
            workspace,
            backend,
            previous: None,
        }
    }

    /// Returns a context carrying `artifact` to the next stage.
    #[must_use]
    pub fn with_previous(self, artifact: &'a Path) -> Self {
        Self {
            previous: Some(artifact),
            ..self
        }
    }

    /// The artifact `stage` consumes: the one handed over by the previous
    /// stage, or the conventional location of the preceding stage's output.
    #[must_use]
    pub fn input_for(&self, stage: StageId) -> PathBuf {
        if let Some(previous) = self.previous {
            return previous.to_path_buf();
        }
        let preceding = StageId::ALL
            .iter()
            .copied()
            .find(|s| s.next() == Some(stage))
            .unwrap_or(stage);
        self.workspace.layout().for_stage(preceding).to_path_buf()
    }

    /// Where `stage` writes its artifact.
    #[must_use]
    pub fn output_for(&self, stage: StageId) -> PathBuf {
        self.workspace.layout().for_stage(stage).to_path_buf()
    }
}

/// One step of the pipeline.
pub trait Stage: Debug {
    /// Returns the stage identity.
    fn id(&self) -> StageId;

    /// Returns the stage name.
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Runs the stage and returns the artifact it wrote.
    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf>;
}

/// The five stages in execution order.
#[must_use]
pub fn standard_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(InterpolateStage),
        Box::new(AggregateStage),
        Box::new(JoinStage),
        Box::new(RegressStage),
        Box::new(RenderStage),
    ]
}
