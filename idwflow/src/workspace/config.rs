//! Configuration types for a workspace.
//!
//! Every key is optional; an absent `idwflow.json` yields the conventional
//! layout and field names the pipeline was designed around.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the optional config file inside the workspace.
pub const CONFIG_FILE: &str = "idwflow.json";

/// Input file locations, relative to the workspace unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Point samples (GeoJSON points).
    #[serde(default = "default_point_file")]
    pub point_file: PathBuf,
    /// Census tracts (GeoJSON polygons).
    #[serde(default = "default_tracts_file")]
    pub tracts_file: PathBuf,
    /// Map composition template (JSON).
    #[serde(default = "default_map_template")]
    pub map_template: PathBuf,
    /// Symbology template for the regression layer (JSON).
    #[serde(default = "default_symbology_template")]
    pub symbology_template: PathBuf,
    /// Analysis parameters.
    #[serde(flatten)]
    pub settings: AnalysisSettings,
}

fn default_point_file() -> PathBuf {
    PathBuf::from("well_nitrate.geojson")
}

fn default_tracts_file() -> PathBuf {
    PathBuf::from("cancer_tracts.geojson")
}

fn default_map_template() -> PathBuf {
    PathBuf::from("cancer_data_map.json")
}

fn default_symbology_template() -> PathBuf {
    PathBuf::from("least_squares_symbology.json")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            point_file: default_point_file(),
            tracts_file: default_tracts_file(),
            map_template: default_map_template(),
            symbology_template: default_symbology_template(),
            settings: AnalysisSettings::default(),
        }
    }
}

/// Field names and numeric knobs shared by every run.
///
/// None of these depend on `k`; they are fixed when the workspace is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Numeric attribute of the point samples to interpolate.
    #[serde(default = "default_value_field")]
    pub value_field: String,
    /// Zone identifier shared by the tracts and the statistics table.
    #[serde(default = "default_zone_field")]
    pub zone_field: String,
    /// Dependent variable of the regression, as a joined field name.
    #[serde(default = "default_dependent_field")]
    pub dependent_field: String,
    /// Explanatory variables of the regression, as joined field names.
    #[serde(default = "default_explanatory_fields")]
    pub explanatory_fields: Vec<String>,
    /// Identifier copied onto each regression output feature.
    #[serde(default = "default_unique_id_field")]
    pub unique_id_field: String,
    /// Nearest samples used per interpolated cell.
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
    /// Output cell size; derived from the sample extent when absent.
    #[serde(default)]
    pub cell_size: Option<f64>,
    /// File name of the exported map image.
    #[serde(default = "default_image_name")]
    pub image_name: String,
}

fn default_value_field() -> String {
    "nitr_ran".to_string()
}

fn default_zone_field() -> String {
    "GEOID10".to_string()
}

fn default_dependent_field() -> String {
    "zonal_table.MEAN".to_string()
}

fn default_explanatory_fields() -> Vec<String> {
    vec!["cancer_tracts.canrate".to_string()]
}

fn default_unique_id_field() -> String {
    "cancer_tracts.GEOID10".to_string()
}

fn default_neighbours() -> usize {
    12
}

fn default_image_name() -> String {
    "idwout.jpg".to_string()
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            value_field: default_value_field(),
            zone_field: default_zone_field(),
            dependent_field: default_dependent_field(),
            explanatory_fields: default_explanatory_fields(),
            unique_id_field: default_unique_id_field(),
            neighbours: default_neighbours(),
            cell_size: None,
            image_name: default_image_name(),
        }
    }
}

impl AnalysisSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nearest-neighbour count.
    #[must_use]
    pub fn with_neighbours(mut self, neighbours: usize) -> Self {
        self.neighbours = neighbours;
        self
    }

    /// Sets a fixed output cell size.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    /// Sets the exported image name.
    #[must_use]
    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = name.into();
        self
    }
}
