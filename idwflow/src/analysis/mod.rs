//! The geoprocessing library behind the pipeline stages.
//!
//! [`AnalysisBackend`] is the seam between orchestration and computation:
//! five operations, each taking a parameter record of paths and scalars and
//! returning the path it wrote. [`NativeBackend`] implements them over
//! GeoJSON, ESRI ASCII grids and JSON templates.

pub mod idw;
pub mod join;
pub mod ols;
pub mod raster;
pub mod render;
pub mod vector;
pub mod zonal;

mod native;

pub use native::NativeBackend;

use crate::errors::GeoResult;
use std::path::PathBuf;

/// Parameters of the interpolate operation.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolateParams {
    /// Point dataset.
    pub points: PathBuf,
    /// Numeric attribute to interpolate.
    pub value_field: String,
    /// Distance exponent `k`.
    pub power: f64,
    /// Nearest samples per cell.
    pub neighbours: usize,
    /// Output cell size; derived from the sample extent when `None`.
    pub cell_size: Option<f64>,
    /// Raster to write.
    pub output: PathBuf,
}

/// Parameters of the aggregate operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateParams {
    /// Zone polygons.
    pub zones: PathBuf,
    /// Zone identifier attribute.
    pub zone_field: String,
    /// Value raster.
    pub raster: PathBuf,
    /// Table to write.
    pub output: PathBuf,
}

/// Parameters of the join operation.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinParams {
    /// Layer receiving the table fields.
    pub target: PathBuf,
    /// Key attribute on both sides.
    pub key_field: String,
    /// Statistics table.
    pub table: PathBuf,
    /// Joined layer to write.
    pub output: PathBuf,
}

/// Parameters of the regress operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressParams {
    /// Input layer.
    pub layer: PathBuf,
    /// Identifier copied to each output feature.
    pub unique_id_field: String,
    /// Dependent variable.
    pub dependent_field: String,
    /// Explanatory variables.
    pub explanatory_fields: Vec<String>,
    /// Output layer to write.
    pub output: PathBuf,
}

/// Parameters of the render operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Layer to draw.
    pub layer: PathBuf,
    /// Symbology template.
    pub symbology: PathBuf,
    /// Map template.
    pub map_template: PathBuf,
    /// Image to write; the extension selects the format.
    pub output: PathBuf,
}

/// The five geoprocessing operations of a run.
///
/// Every operation writes exactly one file, overwriting any previous one,
/// and returns its path. Failures carry the library diagnostic.
#[cfg_attr(test, mockall::automock)]
pub trait AnalysisBackend {
    /// Interpolates point values onto a raster surface.
    fn interpolate(&self, params: &InterpolateParams) -> GeoResult<PathBuf>;

    /// Summarises a raster per zone into a statistics table.
    fn aggregate(&self, params: &AggregateParams) -> GeoResult<PathBuf>;

    /// Joins a statistics table onto a layer.
    fn join(&self, params: &JoinParams) -> GeoResult<PathBuf>;

    /// Fits an OLS model over a layer and writes the diagnostics layer.
    fn regress(&self, params: &RegressParams) -> GeoResult<PathBuf>;

    /// Symbolises a layer into a map and exports it as an image.
    fn render(&self, params: &RenderParams) -> GeoResult<PathBuf>;
}
