//! Stage identity and artifact kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five fixed analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// IDW interpolation of the point samples onto a raster surface.
    Interpolate,
    /// Zonal statistics of the surface over the tracts.
    Aggregate,
    /// Attribute join of the statistics table onto the tracts.
    Join,
    /// Ordinary least squares regression on the joined layer.
    Regress,
    /// Symbology, map composition and image export.
    Render,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [Self; 5] = [
        Self::Interpolate,
        Self::Aggregate,
        Self::Join,
        Self::Regress,
        Self::Render,
    ];

    /// Returns the lowercase stage name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Interpolate => "interpolate",
            Self::Aggregate => "aggregate",
            Self::Join => "join",
            Self::Regress => "regress",
            Self::Render => "render",
        }
    }

    /// Returns the 1-based position of the stage in the pipeline.
    #[must_use]
    pub fn ordinal(self) -> usize {
        match self {
            Self::Interpolate => 1,
            Self::Aggregate => 2,
            Self::Join => 3,
            Self::Regress => 4,
            Self::Render => 5,
        }
    }

    /// Returns the stage that runs after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Interpolate => Some(Self::Aggregate),
            Self::Aggregate => Some(Self::Join),
            Self::Join => Some(Self::Regress),
            Self::Regress => Some(Self::Render),
            Self::Render => None,
        }
    }

    /// Returns the kind of artifact this stage writes.
    #[must_use]
    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            Self::Interpolate => ArtifactKind::Raster,
            Self::Aggregate => ArtifactKind::StatisticsTable,
            Self::Join => ArtifactKind::JoinedLayer,
            Self::Regress => ArtifactKind::RegressionLayer,
            Self::Render => ArtifactKind::Image,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of file a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Interpolated surface (ESRI ASCII grid).
    Raster,
    /// Zonal statistics table (JSON).
    StatisticsTable,
    /// Tracts with joined statistics (GeoJSON).
    JoinedLayer,
    /// Regression output layer (GeoJSON).
    RegressionLayer,
    /// Exported map image.
    Image,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster => write!(f, "raster"),
            Self::StatisticsTable => write!(f, "statistics_table"),
            Self::JoinedLayer => write!(f, "joined_layer"),
            Self::RegressionLayer => write!(f, "regression_layer"),
            Self::Image => write!(f, "image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_total() {
        let mut stage = StageId::Interpolate;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            assert_eq!(next.ordinal(), stage.ordinal() + 1);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, StageId::ALL.to_vec());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(StageId::Interpolate.to_string(), "interpolate");
        assert_eq!(StageId::Render.to_string(), "render");
    }

    #[test]
    fn test_artifact_kinds() {
        assert_eq!(StageId::Interpolate.artifact_kind(), ArtifactKind::Raster);
        assert_eq!(StageId::Render.artifact_kind(), ArtifactKind::Image);
        assert_eq!(ArtifactKind::StatisticsTable.to_string(), "statistics_table");
    }

    #[test]
    fn test_stage_serialize() {
        let json = serde_json::to_string(&StageId::Regress).unwrap();
        assert_eq!(json, r#""regress""#);
    }
}
