//! Timing and structured span helpers for stage execution.

use crate::core::{StageId, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Attributes describing one stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Run identifier.
    pub run_id: Uuid,
    /// The stage.
    pub stage: StageId,
    /// Final status.
    pub status: Option<StageStatus>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Artifact written.
    pub artifact: Option<String>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Creates attributes for a stage that has not finished.
    #[must_use]
    pub fn new(run_id: Uuid, stage: StageId) -> Self {
        Self {
            run_id,
            stage,
            status: None,
            duration_ms: None,
            artifact: None,
            error: None,
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens the attributes into dotted keys.
    #[must_use]
    pub fn to_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("pipeline.run_id".to_string(), self.run_id.to_string());
        fields.insert("stage.name".to_string(), self.stage.to_string());
        fields.insert("stage.ordinal".to_string(), self.stage.ordinal().to_string());

        if let Some(status) = self.status {
            fields.insert("stage.status".to_string(), status.to_string());
        }
        if let Some(v) = self.duration_ms {
            fields.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.artifact {
            fields.insert("stage.artifact".to_string(), v.clone());
        }
        if let Some(ref v) = self.error {
            fields.insert("stage.error".to_string(), v.clone());
        }
        fields
    }

    /// Logs the finished span at debug level.
    pub fn record(&self) {
        tracing::debug!(
            run_id = %self.run_id,
            stage = %self.stage,
            status = ?self.status,
            duration_ms = ?self.duration_ms,
            artifact = ?self.artifact,
            error = ?self.error,
            "Stage span"
        );
    }
}
