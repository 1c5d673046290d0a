//! Stage artifact type describing the file a stage produced.

use super::{ArtifactKind, StageId};
use crate::errors::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A file written by one stage and consumed by the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// The producing stage.
    pub stage: StageId,

    /// What the file holds.
    pub kind: ArtifactKind,

    /// Location inside the workspace.
    pub path: PathBuf,

    /// File size in bytes.
    pub bytes: u64,

    /// Hex-encoded SHA-256 of the file content.
    pub sha256: String,

    /// When the artifact was recorded (ISO 8601).
    pub created_at: String,
}

impl StageArtifact {
    /// Reads the file at `path` and records it as the artifact of `stage`.
    pub fn inspect(stage: StageId, path: impl Into<PathBuf>) -> GeoResult<Self> {
        let path = path.into();
        let content = std::fs::read(&path).map_err(|e| GeoError::io(&path, e))?;

        Ok(Self {
            stage,
            kind: stage.artifact_kind(),
            bytes: content.len() as u64,
            sha256: hex::encode(Sha256::digest(&content)),
            path,
            created_at: crate::utils::iso_timestamp(),
        })
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `other` has identical content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.sha256 == other.sha256
    }
}
