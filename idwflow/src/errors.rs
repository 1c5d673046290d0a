//! Error types for the idwflow pipeline.
//!
//! Run-level failures are deliberately flat: a [`ValidationError`] before any
//! stage runs, or an [`AnalysisError`] raised by exactly one stage. The
//! analysis library reports its own diagnostics as [`GeoError`], and building
//! a workspace can fail with [`ConfigError`].

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for analysis library operations.
pub type GeoResult<T> = Result<T, GeoError>;

/// Rejection of the raw `k` input.
///
/// Always recoverable: nothing has run and nothing was written, so the caller
/// may re-prompt and retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    /// The input was empty.
    #[error("An integer k value between {min} - {max} is required")]
    Empty {
        /// Lower bound of the accepted range.
        min: u32,
        /// Upper bound of the accepted range.
        max: u32,
    },

    /// The input was not a plain decimal integer.
    #[error("An integer k value between {min} - {max} is required, got '{raw}'")]
    NotAnInteger {
        /// The offending raw input.
        raw: String,
        /// Lower bound of the accepted range.
        min: u32,
        /// Upper bound of the accepted range.
        max: u32,
    },

    /// The input was an integer outside the accepted range.
    #[error("Your value: {raw}. Choose a value between {min} - {max}")]
    OutOfRange {
        /// The offending raw input.
        raw: String,
        /// Lower bound of the accepted range.
        min: u32,
        /// Upper bound of the accepted range.
        max: u32,
    },
}

impl ValidationError {
    /// Returns the raw input that was rejected.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Empty { .. } => "",
            Self::NotAnInteger { raw, .. } | Self::OutOfRange { raw, .. } => raw,
        }
    }

    /// Returns the accepted closed range as `(min, max)`.
    #[must_use]
    pub fn range(&self) -> (u32, u32) {
        match self {
            Self::Empty { min, max }
            | Self::NotAnInteger { min, max, .. }
            | Self::OutOfRange { min, max, .. } => (*min, *max),
        }
    }
}

/// Failure of one analysis stage.
///
/// Carries the library diagnostic verbatim together with the stage that
/// raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{stage} stage failed: {message}")]
pub struct AnalysisError {
    /// The stage that failed.
    pub stage: StageId,
    /// The underlying diagnostic message.
    pub message: String,
}

impl AnalysisError {
    /// Creates a new analysis error.
    #[must_use]
    pub fn new(stage: StageId, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Wraps a library error raised while running `stage`.
    #[must_use]
    pub fn from_geo(stage: StageId, err: &GeoError) -> Self {
        Self::new(stage, err.to_string())
    }

    /// Returns the diagnostic message without the stage prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised by the analysis library.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Reading or writing a file failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or written.
    #[error("JSON error in '{}': {source}", .path.display())]
    Json {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// A file was readable but its content is malformed.
    #[error("Malformed '{}': {message}", .path.display())]
    Format {
        /// The file involved.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// A required attribute is absent.
    #[error("Field '{field}' not found in {dataset}")]
    MissingField {
        /// The dataset searched.
        dataset: String,
        /// The missing attribute.
        field: String,
    },

    /// An attribute holds a value of the wrong type.
    #[error("Field '{field}' in {dataset} is not {expected}")]
    FieldType {
        /// The dataset searched.
        dataset: String,
        /// The attribute.
        field: String,
        /// The expected type.
        expected: &'static str,
    },

    /// A dataset has no usable records.
    #[error("Dataset {0} is empty")]
    EmptyDataset(String),

    /// Raster dimensions are unusable.
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Column count.
        width: usize,
        /// Row count.
        height: usize,
    },

    /// A parameter value is out of its domain.
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The computation itself failed.
    #[error("Algorithm error: {0}")]
    Algorithm(String),

    /// Encoding the output image failed.
    #[error("Image export to '{}' failed: {source}", .path.display())]
    Image {
        /// The image file.
        path: PathBuf,
        /// The underlying error.
        source: image::ImageError,
    },

    /// The requested output format is not supported.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

impl GeoError {
    /// Builds an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a JSON error for `path`.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Builds a missing-field error.
    pub fn missing_field(dataset: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            dataset: dataset.into(),
            field: field.into(),
        }
    }
}

/// Errors raised while building a [`crate::workspace::WorkspaceContext`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The workspace directory could not be created.
    #[error("Cannot create workspace '{}': {source}", .path.display())]
    CreateWorkspace {
        /// The workspace directory.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The workspace path exists but is not a directory.
    #[error("Workspace '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The config file could not be read.
    #[error("Cannot read config '{}': {source}", .path.display())]
    Read {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected schema.
    #[error("Invalid config '{}': {source}", .path.display())]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
}
