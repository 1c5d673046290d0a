//! Pipeline orchestrator.

use super::state::RunTracker;
use crate::analysis::{AnalysisBackend, NativeBackend};
use crate::core::{
    AnalysisRequest, PipelineResult, RunFailure, RunState, RunSummary, StageArtifact, StageRecord,
    StageStatus,
};
use crate::errors::AnalysisError;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::observability::{SpanTimer, StageSpanAttributes};
use crate::stages::{standard_stages, Stage, StageContext};
use crate::utils::now_utc;
use crate::workspace::WorkspaceContext;
use tracing::{info, info_span, warn};

/// Runs the five analysis stages against one workspace.
///
/// The pipeline holds no per-run state; every call to [`Pipeline::run`]
/// starts from [`RunState::Idle`] with a fresh request.
pub struct Pipeline<B: AnalysisBackend = NativeBackend> {
    workspace: WorkspaceContext,
    backend: B,
    stages: Vec<Box<dyn Stage>>,
    sink: Box<dyn EventSink>,
}

impl<B: AnalysisBackend> std::fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("workspace", &self.workspace.workspace_directory())
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl<B: AnalysisBackend> Pipeline<B> {
    /// Creates a pipeline over `workspace` backed by `backend`.
    pub fn new(workspace: WorkspaceContext, backend: B) -> Self {
        Self {
            workspace,
            backend,
            stages: standard_stages(),
            sink: Box::new(NoOpEventSink),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Returns the workspace.
    pub fn workspace(&self) -> &WorkspaceContext {
        &self.workspace
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validates `k_raw` and, if valid, runs all five stages.
    ///
    /// A rejected input runs nothing and touches no artifact. Otherwise the
    /// stages run in order, each receiving the previous artifact, and the
    /// first failure ends the run.
    pub fn run(&self, k_raw: &str) -> PipelineResult {
        let timer = SpanTimer::start("pipeline");
        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Validating);

        match AnalysisRequest::parse(k_raw) {
            Ok(request) => self.execute(&request, tracker, timer),
            Err(err) => {
                tracker.advance(RunState::Rejected);
                warn!(raw = k_raw, error = %err, "Input rejected");
                self.sink.emit(&PipelineEvent::PipelineRejected {
                    raw: k_raw.to_string(),
                    message: err.to_string(),
                });
                PipelineResult::Rejected(err)
            }
        }
    }

    fn execute(
        &self,
        request: &AnalysisRequest,
        mut tracker: RunTracker,
        timer: SpanTimer,
    ) -> PipelineResult {
        let run_id = request.run_id();
        tracker.set_run_id(run_id);

        info!(%run_id, k = request.k(), workspace = %self.workspace.workspace_directory().display(), "Pipeline started");
        self.sink.emit(&PipelineEvent::PipelineStarted {
            run_id,
            k: request.k(),
        });

        let mut records: Vec<StageRecord> = Vec::with_capacity(self.stages.len());
        let mut artifacts: Vec<StageArtifact> = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let id = stage.id();
            tracker.advance(RunState::Running(id));

            let span = info_span!("stage", stage = %id, %run_id);
            let _entered = span.enter();

            self.sink.emit(&PipelineEvent::StageStarted { run_id, stage: id });
            info!(ordinal = id.ordinal(), "Stage started");

            let started_at = now_utc();
            let stage_timer = SpanTimer::start(id.name());

            let mut ctx = StageContext::new(request, &self.workspace, &self.backend);
            if let Some(previous) = artifacts.last() {
                ctx = ctx.with_previous(previous.path());
            }
            let outcome = stage
                .execute(&ctx)
                .and_then(|path| StageArtifact::inspect(id, path));
            let duration_ms = stage_timer.finish();

            match outcome {
                Ok(artifact) => {
                    info!(
                        artifact = %artifact.path.display(),
                        bytes = artifact.bytes,
                        duration_ms,
                        "Stage completed"
                    );
                    StageSpanAttributes::new(run_id, id)
                        .with_status(StageStatus::Ok)
                        .with_duration_ms(duration_ms)
                        .with_artifact(artifact.path.display().to_string())
                        .record();
                    self.sink.emit(&PipelineEvent::StageCompleted {
                        run_id,
                        stage: id,
                        artifact: artifact.path.clone(),
                        duration_ms,
                    });
                    records.push(StageRecord::completed(
                        id,
                        started_at,
                        duration_ms,
                        artifact.clone(),
                    ));
                    artifacts.push(artifact);
                }
                Err(err) => {
                    let error = AnalysisError::from_geo(id, &err);
                    warn!(error = %error.message(), duration_ms, "Stage failed");
                    StageSpanAttributes::new(run_id, id)
                        .with_status(StageStatus::Fail)
                        .with_duration_ms(duration_ms)
                        .with_error(error.message())
                        .record();
                    self.sink.emit(&PipelineEvent::StageFailed {
                        run_id,
                        stage: id,
                        message: error.message().to_string(),
                        duration_ms,
                    });
                    records.push(StageRecord::failed(
                        id,
                        started_at,
                        duration_ms,
                        error.message(),
                    ));

                    tracker.advance(RunState::Failed);
                    self.sink.emit(&PipelineEvent::PipelineFailed {
                        run_id,
                        stage: id,
                        message: error.message().to_string(),
                    });
                    return PipelineResult::Failed(RunFailure {
                        run_id,
                        k: request.k(),
                        error,
                        stages: records,
                        duration_ms: timer.finish(),
                    });
                }
            }
        }

        tracker.advance(RunState::Succeeded);
        let duration_ms = timer.finish();
        let image_path = artifacts.last().map_or_else(
            || self.workspace.layout().image().to_path_buf(),
            |a| a.path.clone(),
        );

        info!(%run_id, image = %image_path.display(), duration_ms, "Pipeline succeeded");
        self.sink.emit(&PipelineEvent::PipelineSucceeded {
            run_id,
            image_path: image_path.clone(),
            duration_ms,
        });

        PipelineResult::Succeeded(RunSummary {
            run_id,
            k: request.k(),
            image_path,
            artifacts,
            stages: records,
            duration_ms,
        })
    }
}
