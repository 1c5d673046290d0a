//! File-backed implementation of the analysis operations.

use super::idw::{idw, samples_from_points, IdwParams};
use super::join::join_table;
use super::ols::{regress_layer, RegressionFields};
use super::raster::Raster;
use super::render::{compose_map, export_image, MapTemplate, Symbology};
use super::vector::{dataset_name, FeatureCollection};
use super::zonal::{zonal_statistics, zones_from_polygons, ZonalTable};
use super::{
    AggregateParams, AnalysisBackend, InterpolateParams, JoinParams, RegressParams, RenderParams,
};
use crate::errors::GeoResult;
use std::path::PathBuf;
use tracing::{debug, info};

/// Pure-Rust backend over GeoJSON, ASCII grids and JSON templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisBackend for NativeBackend {
    fn interpolate(&self, params: &InterpolateParams) -> GeoResult<PathBuf> {
        let points = FeatureCollection::read(&params.points)?;
        let dataset = dataset_name(&params.points);
        let samples = samples_from_points(&points, &dataset, &params.value_field)?;

        let grid = IdwParams::covering(&samples, params.cell_size, params.power, params.neighbours)?;
        debug!(
            rows = grid.rows,
            cols = grid.cols,
            cell_size = grid.transform.pixel_width,
            power = grid.power,
            "IDW grid"
        );

        let surface = idw(&samples, &grid)?;
        surface.write_ascii_grid(&params.output)?;

        info!(
            samples = samples.len(),
            cells = surface.valid_count(),
            output = %params.output.display(),
            "Interpolated surface"
        );
        Ok(params.output.clone())
    }

    fn aggregate(&self, params: &AggregateParams) -> GeoResult<PathBuf> {
        let polygons = FeatureCollection::read(&params.zones)?;
        let dataset = dataset_name(&params.zones);
        let zones = zones_from_polygons(&polygons, &dataset, &params.zone_field)?;
        let surface = Raster::read_ascii_grid(&params.raster)?;

        let table = ZonalTable {
            name: dataset_name(&params.output),
            zone_field: params.zone_field.clone(),
            rows: zonal_statistics(&surface, &zones)?,
        };
        table.write(&params.output)?;

        info!(
            zones = zones.len(),
            rows = table.rows.len(),
            output = %params.output.display(),
            "Computed zonal statistics"
        );
        Ok(params.output.clone())
    }

    fn join(&self, params: &JoinParams) -> GeoResult<PathBuf> {
        let target = FeatureCollection::read(&params.target)?;
        let table = ZonalTable::read(&params.table)?;

        let joined = join_table(&target, &dataset_name(&params.target), &table, &params.key_field)?;
        joined.layer.write(&params.output)?;

        info!(
            features = joined.layer.len(),
            matched = joined.matched,
            output = %params.output.display(),
            "Joined statistics table"
        );
        Ok(params.output.clone())
    }

    fn regress(&self, params: &RegressParams) -> GeoResult<PathBuf> {
        let layer = FeatureCollection::read(&params.layer)?;
        let fields = RegressionFields {
            unique_id: &params.unique_id_field,
            dependent: &params.dependent_field,
            explanatory: &params.explanatory_fields,
        };

        let (output, summary) = regress_layer(&layer, &dataset_name(&params.layer), fields)?;
        output.write(&params.output)?;

        info!(
            observations = summary.observations,
            r_squared = summary.r_squared,
            output = %params.output.display(),
            "Fitted OLS model"
        );
        Ok(params.output.clone())
    }

    fn render(&self, params: &RenderParams) -> GeoResult<PathBuf> {
        let layer = FeatureCollection::read(&params.layer)?;
        let symbology = Symbology::read(&params.symbology)?;
        let template = MapTemplate::read(&params.map_template)?;

        let canvas = compose_map(&layer, &dataset_name(&params.layer), &symbology, &template)?;
        export_image(&canvas, &params.output, template.jpeg_quality)?;

        info!(
            width = template.width,
            height = template.height,
            output = %params.output.display(),
            "Exported map"
        );
        Ok(params.output.clone())
    }
}
