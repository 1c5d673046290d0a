//! Recording backend for pipeline tests.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::analysis::{
    AggregateParams, AnalysisBackend, InterpolateParams, JoinParams, RegressParams, RenderParams,
};
use crate::core::StageId;
use crate::errors::{GeoError, GeoResult};

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `interpolate` was called.
    Interpolate(InterpolateParams),
    /// `aggregate` was called.
    Aggregate(AggregateParams),
    /// `join` was called.
    Join(JoinParams),
    /// `regress` was called.
    Regress(RegressParams),
    /// `render` was called.
    Render(RenderParams),
}

impl BackendCall {
    /// The stage the call belongs to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::Interpolate(_) => StageId::Interpolate,
            Self::Aggregate(_) => StageId::Aggregate,
            Self::Join(_) => StageId::Join,
            Self::Regress(_) => StageId::Regress,
            Self::Render(_) => StageId::Render,
        }
    }
}

/// A backend that records every call and writes a small placeholder file
/// instead of doing any geoprocessing.
///
/// Each placeholder holds the call parameters followed by the content of the
/// upstream input, so `k` reaches every artifact of the run.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    failure: Option<(StageId, String)>,
}

impl RecordingBackend {
    /// Creates a backend whose every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that fails at `stage` with `message`.
    #[must_use]
    pub fn failing_at(stage: StageId, message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some((stage, message.into())),
        }
    }

    /// Returns every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Returns the stages called, in order.
    #[must_use]
    pub fn stages_called(&self) -> Vec<StageId> {
        self.calls.lock().iter().map(BackendCall::stage).collect()
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn handle(&self, call: BackendCall, input: &Path, output: &Path) -> GeoResult<PathBuf> {
        let stage = call.stage();
        let upstream = std::fs::read_to_string(input).unwrap_or_default();
        let content = format!("{stage}\n{call:?}\n{upstream}");
        self.calls.lock().push(call);

        if let Some((failing, message)) = &self.failure {
            if *failing == stage {
                return Err(GeoError::Algorithm(message.clone()));
            }
        }

        std::fs::write(output, content).map_err(|e| GeoError::io(output, e))?;
        Ok(output.to_path_buf())
    }
}

impl AnalysisBackend for RecordingBackend {
    fn interpolate(&self, params: &InterpolateParams) -> GeoResult<PathBuf> {
        self.handle(
            BackendCall::Interpolate(params.clone()),
            &params.points,
            &params.output,
        )
    }

    fn aggregate(&self, params: &AggregateParams) -> GeoResult<PathBuf> {
        self.handle(
            BackendCall::Aggregate(params.clone()),
            &params.raster,
            &params.output,
        )
    }

    fn join(&self, params: &JoinParams) -> GeoResult<PathBuf> {
        self.handle(
            BackendCall::Join(params.clone()),
            &params.table,
            &params.output,
        )
    }

    fn regress(&self, params: &RegressParams) -> GeoResult<PathBuf> {
        self.handle(
            BackendCall::Regress(params.clone()),
            &params.layer,
            &params.output,
        )
    }

    fn render(&self, params: &RenderParams) -> GeoResult<PathBuf> {
        self.handle(
            BackendCall::Render(params.clone()),
            &params.layer,
            &params.output,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_params(dir: &Path) -> RenderParams {
        RenderParams {
            layer: dir.join("least_squares.geojson"),
            symbology: dir.join("least_squares_symbology.json"),
            map_template: dir.join("cancer_data_map.json"),
            output: dir.join("idwout.jpg"),
        }
    }

    #[test]
    fn test_recording_backend_writes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::new();

        let path = backend.render(&render_params(dir.path())).unwrap();

        assert!(path.is_file());
        assert_eq!(backend.stages_called(), vec![StageId::Render]);
    }

    #[test]
    fn test_failing_backend_records_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::failing_at(StageId::Render, "layout missing");

        let err = backend.render(&render_params(dir.path())).unwrap_err();

        assert_eq!(err.to_string(), "Algorithm error: layout missing");
        assert_eq!(backend.call_count(), 1);
        assert!(!dir.path().join("idwout.jpg").exists());

        backend.reset();
        assert_eq!(backend.call_count(), 0);
    }
}
