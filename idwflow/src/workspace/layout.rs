//! Deterministic artifact locations.

use crate::core::StageId;
use std::path::{Path, PathBuf};

/// Interpolated surface written by the interpolate stage.
pub const RASTER_FILE: &str = "idwout.asc";
/// Statistics table written by the aggregate stage.
pub const TABLE_FILE: &str = "zonal_table.json";
/// Joined layer written by the join stage.
pub const JOINED_FILE: &str = "tracts_joined.geojson";
/// Regression layer written by the regress stage.
pub const REGRESSION_FILE: &str = "least_squares.geojson";

/// Where each stage writes its artifact.
///
/// Derived from the workspace alone, so every run of a stage targets the same
/// file and overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    raster: PathBuf,
    statistics_table: PathBuf,
    joined_layer: PathBuf,
    regression_layer: PathBuf,
    image: PathBuf,
}

impl ArtifactLayout {
    /// Lays out artifacts inside `workspace_directory`.
    #[must_use]
    pub fn new(workspace_directory: &Path, image_name: &str) -> Self {
        Self {
            raster: workspace_directory.join(RASTER_FILE),
            statistics_table: workspace_directory.join(TABLE_FILE),
            joined_layer: workspace_directory.join(JOINED_FILE),
            regression_layer: workspace_directory.join(REGRESSION_FILE),
            image: workspace_directory.join(image_name),
        }
    }

    /// Returns the artifact path of `stage`.
    #[must_use]
    pub fn for_stage(&self, stage: StageId) -> &Path {
        match stage {
            StageId::Interpolate => &self.raster,
            StageId::Aggregate => &self.statistics_table,
            StageId::Join => &self.joined_layer,
            StageId::Regress => &self.regression_layer,
            StageId::Render => &self.image,
        }
    }

    /// Returns every artifact path in stage order.
    #[must_use]
    pub fn all(&self) -> [&Path; 5] {
        StageId::ALL.map(|stage| self.for_stage(stage))
    }

    /// Returns the interpolated raster path.
    #[must_use]
    pub fn raster(&self) -> &Path {
        &self.raster
    }

    /// Returns the statistics table path.
    #[must_use]
    pub fn statistics_table(&self) -> &Path {
        &self.statistics_table
    }

    /// Returns the joined layer path.
    #[must_use]
    pub fn joined_layer(&self) -> &Path {
        &self.joined_layer
    }

    /// Returns the regression layer path.
    #[must_use]
    pub fn regression_layer(&self) -> &Path {
        &self.regression_layer
    }

    /// Returns the exported image path.
    #[must_use]
    pub fn image(&self) -> &Path {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_deterministic() {
        let a = ArtifactLayout::new(Path::new("/ws"), "idwout.jpg");
        let b = ArtifactLayout::new(Path::new("/ws"), "idwout.jpg");
        assert_eq!(a, b);
        assert_eq!(a.raster(), Path::new("/ws/idwout.asc"));
        assert_eq!(a.image(), Path::new("/ws/idwout.jpg"));
    }

    #[test]
    fn test_every_stage_has_a_distinct_artifact() {
        let layout = ArtifactLayout::new(Path::new("/ws"), "idwout.jpg");
        let paths = layout.all();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(layout.for_stage(StageId::Join), layout.joined_layer());
        assert_eq!(layout.for_stage(StageId::Regress), layout.regression_layer());
        assert_eq!(layout.for_stage(StageId::Aggregate), layout.statistics_table());
    }
}
