//! A synthetic, fully populated workspace.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;

use crate::analysis::render::{MapTemplate, Symbology};
use crate::analysis::vector::{Feature, FeatureCollection, Geometry};
use crate::errors::{GeoError, GeoResult};
use crate::workspace::{WorkspaceConfig, CONFIG_FILE};

/// Writes the four workspace inputs for a small grid of square tracts with
/// wells scattered over them.
///
/// The nitrate surface rises from the south-west corner to the north-east
/// one and the tract cancer rate follows it with noise, so the regression
/// always has something to fit. Output is deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct WorkspaceFixture {
    seed: u64,
    columns: usize,
    rows: usize,
    tract_size: f64,
    wells: usize,
    zone_field: bool,
    cell_size: Option<f64>,
    map_template: MapTemplate,
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        Self {
            seed: 42,
            columns: 4,
            rows: 3,
            tract_size: 1000.0,
            wells: 40,
            zone_field: true,
            cell_size: None,
            map_template: MapTemplate {
                width: 320,
                height: 240,
                margin: 10,
                ..MapTemplate::default()
            },
        }
    }
}

/// South-west corner of the tract grid.
const ORIGIN: (f64, f64) = (600_000.0, 4_800_000.0);

impl WorkspaceFixture {
    /// Creates the default fixture: 4 x 3 tracts, 40 wells.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the tract grid dimensions.
    #[must_use]
    pub fn with_grid(mut self, columns: usize, rows: usize) -> Self {
        self.columns = columns.max(1);
        self.rows = rows.max(1);
        self
    }

    /// Sets the number of wells, in addition to one on each grid corner.
    #[must_use]
    pub fn with_wells(mut self, wells: usize) -> Self {
        self.wells = wells;
        self
    }

    /// Leaves the zone identifier off every tract.
    #[must_use]
    pub fn without_zone_field(mut self) -> Self {
        self.zone_field = false;
        self
    }

    /// Writes an `idwflow.json` fixing the interpolation cell size.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    /// Number of tracts written.
    #[must_use]
    pub fn tract_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Zone identifier of the tract at `index`.
    #[must_use]
    pub fn tract_id(index: usize) -> String {
        format!("55025{index:06}")
    }

    /// Writes every input into `dir`, which must exist.
    pub fn write_to(&self, dir: &Path) -> GeoResult<()> {
        let config = WorkspaceConfig::default();
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.wells_layer(&mut rng)
            .write(&dir.join(&config.point_file))?;
        self.tracts_layer(&mut rng)
            .write(&dir.join(&config.tracts_file))?;
        write_json(&dir.join(&config.map_template), &self.map_template)?;
        write_json(
            &dir.join(&config.symbology_template),
            &Symbology::standardized_residuals(),
        )?;

        if let Some(cell_size) = self.cell_size {
            let mut config = config;
            config.settings.cell_size = Some(cell_size);
            write_json(&dir.join(CONFIG_FILE), &config)?;
        }
        Ok(())
    }

    fn width(&self) -> f64 {
        self.columns as f64 * self.tract_size
    }

    fn height(&self) -> f64 {
        self.rows as f64 * self.tract_size
    }

    fn nitrate(&self, x: f64, y: f64) -> f64 {
        let fx = (x - ORIGIN.0) / self.width();
        let fy = (y - ORIGIN.1) / self.height();
        2.0 + 6.0 * fx + 3.0 * fy
    }

    fn wells_layer(&self, rng: &mut StdRng) -> FeatureCollection {
        let (x0, y0) = ORIGIN;
        let (x1, y1) = (x0 + self.width(), y0 + self.height());

        let mut positions = vec![(x0, y0), (x1, y0), (x0, y1), (x1, y1)];
        positions.extend(
            (0..self.wells).map(|_| (rng.gen_range(x0..x1), rng.gen_range(y0..y1))),
        );

        let features = positions
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let value = self.nitrate(x, y) + rng.gen_range(-0.5..0.5);
                let mut props = Map::new();
                props.insert("TARGET_FID".to_string(), json!(i));
                props.insert("nitr_ran".to_string(), json!(value.max(0.0)));
                Feature::new(Some(Geometry::Point(vec![x, y])), props)
            })
            .collect();
        FeatureCollection::new(features)
    }

    fn tracts_layer(&self, rng: &mut StdRng) -> FeatureCollection {
        let size = self.tract_size;
        let mut features = Vec::with_capacity(self.tract_count());

        for row in 0..self.rows {
            for col in 0..self.columns {
                let index = row * self.columns + col;
                let x = ORIGIN.0 + col as f64 * size;
                let y = ORIGIN.1 + row as f64 * size;
                let ring = vec![
                    vec![x, y],
                    vec![x + size, y],
                    vec![x + size, y + size],
                    vec![x, y + size],
                    vec![x, y],
                ];

                let centre = self.nitrate(x + size / 2.0, y + size / 2.0);
                let canrate = 0.02 * centre + rng.gen_range(0.0..0.08);

                let mut props = Map::new();
                if self.zone_field {
                    props.insert("GEOID10".to_string(), Value::String(Self::tract_id(index)));
                }
                props.insert("canrate".to_string(), json!(canrate));
                features.push(Feature::new(Some(Geometry::Polygon(vec![ring])), props));
            }
        }
        FeatureCollection::new(features)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> GeoResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| GeoError::json(path, e))?;
    std::fs::write(path, text).map_err(|e| GeoError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceContext;

    #[test]
    fn test_fixture_populates_workspace() {
        let dir = tempfile::tempdir().unwrap();
        WorkspaceFixture::new().write_to(dir.path()).unwrap();

        let workspace = WorkspaceContext::open(dir.path()).unwrap();
        assert!(workspace.missing_inputs().is_empty());

        let tracts = FeatureCollection::read(workspace.input_tracts_file()).unwrap();
        assert_eq!(tracts.len(), 12);
        assert!(tracts.has_field("GEOID10"));

        let wells = FeatureCollection::read(workspace.input_point_file()).unwrap();
        assert_eq!(wells.len(), 44);
    }

    #[test]
    fn test_fixture_is_deterministic() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        WorkspaceFixture::new().with_seed(7).write_to(a.path()).unwrap();
        WorkspaceFixture::new().with_seed(7).write_to(b.path()).unwrap();

        let read = |dir: &Path| std::fs::read(dir.join("well_nitrate.geojson")).unwrap();
        assert_eq!(read(a.path()), read(b.path()));
    }

    #[test]
    fn test_fixture_without_zone_field() {
        let dir = tempfile::tempdir().unwrap();
        WorkspaceFixture::new()
            .without_zone_field()
            .with_cell_size(50.0)
            .write_to(dir.path())
            .unwrap();

        let workspace = WorkspaceContext::open(dir.path()).unwrap();
        let tracts = FeatureCollection::read(workspace.input_tracts_file()).unwrap();
        assert!(!tracts.has_field("GEOID10"));
        assert_eq!(workspace.settings().cell_size, Some(50.0));
    }
}
