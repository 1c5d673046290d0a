//! The five analysis stages.

use super::{Stage, StageContext};
use crate::analysis::{
    AggregateParams, InterpolateParams, JoinParams, RegressParams, RenderParams,
};
use crate::core::StageId;
use crate::errors::GeoResult;
use std::path::PathBuf;
use tracing::debug;

/// Interpolates the point samples with power `k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolateStage;

impl InterpolateStage {
    /// Parameters passed to the backend.
    #[must_use]
    pub fn params(ctx: &StageContext<'_>) -> InterpolateParams {
        let settings = ctx.workspace.settings();
        InterpolateParams {
            points: ctx.workspace.input_point_file().to_path_buf(),
            value_field: settings.value_field.clone(),
            power: ctx.request.power(),
            neighbours: settings.neighbours,
            cell_size: settings.cell_size,
            output: ctx.output_for(StageId::Interpolate),
        }
    }
}

impl Stage for InterpolateStage {
    fn id(&self) -> StageId {
        StageId::Interpolate
    }

    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf> {
        let params = Self::params(ctx);
        debug!(?params, "interpolate");
        ctx.backend.interpolate(&params)
    }
}

/// Summarises the surface per tract.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateStage;

impl AggregateStage {
    /// Parameters passed to the backend.
    #[must_use]
    pub fn params(ctx: &StageContext<'_>) -> AggregateParams {
        AggregateParams {
            zones: ctx.workspace.input_tracts_file().to_path_buf(),
            zone_field: ctx.workspace.settings().zone_field.clone(),
            raster: ctx.input_for(StageId::Aggregate),
            output: ctx.output_for(StageId::Aggregate),
        }
    }
}

impl Stage for AggregateStage {
    fn id(&self) -> StageId {
        StageId::Aggregate
    }

    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf> {
        let params = Self::params(ctx);
        debug!(?params, "aggregate");
        ctx.backend.aggregate(&params)
    }
}

/// Joins the statistics table onto the tracts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinStage;

impl JoinStage {
    /// Parameters passed to the backend.
    #[must_use]
    pub fn params(ctx: &StageContext<'_>) -> JoinParams {
        JoinParams {
            target: ctx.workspace.input_tracts_file().to_path_buf(),
            key_field: ctx.workspace.settings().zone_field.clone(),
            table: ctx.input_for(StageId::Join),
            output: ctx.output_for(StageId::Join),
        }
    }
}

impl Stage for JoinStage {
    fn id(&self) -> StageId {
        StageId::Join
    }

    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf> {
        let params = Self::params(ctx);
        debug!(?params, "join");
        ctx.backend.join(&params)
    }
}

/// Regresses the zonal mean against the cancer rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressStage;

impl RegressStage {
    /// Parameters passed to the backend.
    #[must_use]
    pub fn params(ctx: &StageContext<'_>) -> RegressParams {
        let settings = ctx.workspace.settings();
        RegressParams {
            layer: ctx.input_for(StageId::Regress),
            unique_id_field: settings.unique_id_field.clone(),
            dependent_field: settings.dependent_field.clone(),
            explanatory_fields: settings.explanatory_fields.clone(),
            output: ctx.output_for(StageId::Regress),
        }
    }
}

impl Stage for RegressStage {
    fn id(&self) -> StageId {
        StageId::Regress
    }

    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf> {
        let params = Self::params(ctx);
        debug!(?params, "regress");
        ctx.backend.regress(&params)
    }
}

/// Renders the regression layer into the map image.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStage;

impl RenderStage {
    /// Parameters passed to the backend.
    #[must_use]
    pub fn params(ctx: &StageContext<'_>) -> RenderParams {
        RenderParams {
            layer: ctx.input_for(StageId::Render),
            symbology: ctx.workspace.symbology_template_path().to_path_buf(),
            map_template: ctx.workspace.map_template_path().to_path_buf(),
            output: ctx.output_for(StageId::Render),
        }
    }
}

impl Stage for RenderStage {
    fn id(&self) -> StageId {
        StageId::Render
    }

    fn execute(&self, ctx: &StageContext<'_>) -> GeoResult<PathBuf> {
        let params = Self::params(ctx);
        debug!(?params, "render");
        ctx.backend.render(&params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NativeBackend;
    use crate::core::AnalysisRequest;
    use crate::workspace::{WorkspaceConfig, WorkspaceContext};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn with_ctx(f: impl FnOnce(&StageContext<'_>)) {
        let request = AnalysisRequest::parse("7").unwrap();
        let workspace = WorkspaceContext::new("/ws", WorkspaceConfig::default());
        let backend = NativeBackend::new();
        f(&StageContext::new(&request, &workspace, &backend));
    }

    #[test]
    fn test_interpolate_params_carry_k() {
        with_ctx(|ctx| {
            let params = InterpolateStage::params(ctx);
            assert!((params.power - 7.0).abs() < f64::EPSILON);
            assert_eq!(params.points, Path::new("/ws/well_nitrate.geojson"));
            assert_eq!(params.value_field, "nitr_ran");
            assert_eq!(params.neighbours, 12);
            assert_eq!(params.output, Path::new("/ws/idwout.asc"));
        });
    }

    #[test]
    fn test_aggregate_and_join_share_zone_field() {
        with_ctx(|ctx| {
            let aggregate = AggregateStage::params(ctx);
            let join = JoinStage::params(ctx);
            assert_eq!(aggregate.zone_field, "GEOID10");
            assert_eq!(join.key_field, aggregate.zone_field);
            assert_eq!(join.table, aggregate.output);
            assert_eq!(join.target, aggregate.zones);
        });
    }

    #[test]
    fn test_regress_params_use_qualified_fields() {
        with_ctx(|ctx| {
            let params = RegressStage::params(ctx);
            assert_eq!(params.dependent_field, "zonal_table.MEAN");
            assert_eq!(params.explanatory_fields, vec!["cancer_tracts.canrate".to_string()]);
            assert_eq!(params.unique_id_field, "cancer_tracts.GEOID10");
            assert_eq!(params.layer, Path::new("/ws/tracts_joined.geojson"));
        });
    }

    #[test]
    fn test_render_params() {
        with_ctx(|ctx| {
            let params = RenderStage::params(ctx);
            assert_eq!(params.layer, Path::new("/ws/least_squares.geojson"));
            assert_eq!(params.symbology, Path::new("/ws/least_squares_symbology.json"));
            assert_eq!(params.map_template, Path::new("/ws/cancer_data_map.json"));
            assert_eq!(params.output, Path::new("/ws/idwout.jpg"));
        });
    }
}
