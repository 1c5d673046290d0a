//! Zonal statistics of a raster over polygon zones.
//!
//! Zones are burned onto the value grid by cell-centre containment; index 0
//! marks cells outside every zone. Where polygons overlap, the first zone
//! keeps the cell.

use super::raster::{GeoTransform, Raster};
use super::vector::FeatureCollection;
use crate::errors::{GeoError, GeoResult};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// A named polygon zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Zone identifier.
    pub key: String,
    /// Zone footprint.
    pub shape: MultiPolygon<f64>,
}

/// Statistics of one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalRow {
    /// Zone identifier.
    pub zone: String,
    /// Cells with a value.
    #[serde(rename = "COUNT")]
    pub count: usize,
    /// Covered area in square map units.
    #[serde(rename = "AREA")]
    pub area: f64,
    /// Smallest value.
    #[serde(rename = "MIN")]
    pub min: f64,
    /// Largest value.
    #[serde(rename = "MAX")]
    pub max: f64,
    /// `MAX - MIN`.
    #[serde(rename = "RANGE")]
    pub range: f64,
    /// Arithmetic mean.
    #[serde(rename = "MEAN")]
    pub mean: f64,
    /// Population standard deviation.
    #[serde(rename = "STD")]
    pub std: f64,
    /// Sum of values.
    #[serde(rename = "SUM")]
    pub sum: f64,
    /// Median value.
    #[serde(rename = "MEDIAN")]
    pub median: f64,
}

impl ZonalRow {
    /// Names of the statistic columns, in table order.
    pub const FIELDS: [&'static str; 9] = [
        "COUNT", "AREA", "MIN", "MAX", "RANGE", "MEAN", "STD", "SUM", "MEDIAN",
    ];

    /// Statistic columns paired with their values, in table order.
    pub fn values(&self) -> [(&'static str, f64); 9] {
        [
            ("COUNT", self.count as f64),
            ("AREA", self.area),
            ("MIN", self.min),
            ("MAX", self.max),
            ("RANGE", self.range),
            ("MEAN", self.mean),
            ("STD", self.std),
            ("SUM", self.sum),
            ("MEDIAN", self.median),
        ]
    }

    fn from_values(zone: String, mut vals: Vec<f64>, cell_area: f64) -> Self {
        let count = vals.len();
        let sum: f64 = vals.iter().sum();
        let mean = sum / count as f64;
        let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;

        vals.sort_by(f64::total_cmp);
        let min = vals[0];
        let max = vals[count - 1];
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        Self {
            zone,
            count,
            area: count as f64 * cell_area,
            min,
            max,
            range: max - min,
            mean,
            std: var.sqrt(),
            sum,
            median,
        }
    }
}

/// The statistics table written by the aggregate stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalTable {
    /// Table name, used to qualify joined fields.
    pub name: String,
    /// Attribute of the zones the rows are keyed by.
    pub zone_field: String,
    /// One row per covered zone, in zone order.
    pub rows: Vec<ZonalRow>,
}

impl ZonalTable {
    /// Reads a table from JSON.
    pub fn read(path: &Path) -> GeoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| GeoError::json(path, e))
    }

    /// Writes the table as JSON, replacing any existing file.
    pub fn write(&self, path: &Path) -> GeoResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| GeoError::json(path, e))?;
        std::fs::write(path, text).map_err(|e| GeoError::io(path, e))
    }

    /// Finds the row of `zone`.
    pub fn row(&self, zone: &str) -> Option<&ZonalRow> {
        self.rows.iter().find(|r| r.zone == zone)
    }
}

/// Reads the zones of `zone_field` from a polygon collection.
///
/// Features without geometry are skipped. Identifiers must be unique.
pub fn zones_from_polygons(
    polygons: &FeatureCollection,
    dataset: &str,
    zone_field: &str,
) -> GeoResult<Vec<Zone>> {
    if polygons.is_empty() {
        return Err(GeoError::EmptyDataset(dataset.to_string()));
    }
    polygons.require_field(dataset, zone_field)?;

    let mut seen = HashSet::new();
    let mut zones = Vec::with_capacity(polygons.len());
    for feature in &polygons.features {
        let key = feature.key(zone_field).ok_or_else(|| GeoError::FieldType {
            dataset: dataset.to_string(),
            field: zone_field.to_string(),
            expected: "a string or integer identifier",
        })?;
        if !seen.insert(key.clone()) {
            return Err(GeoError::Algorithm(format!(
                "Duplicate zone identifier '{key}' in {dataset}"
            )));
        }
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let shape = geometry.to_multi_polygon().ok_or_else(|| GeoError::FieldType {
            dataset: dataset.to_string(),
            field: "geometry".to_string(),
            expected: "a Polygon or MultiPolygon",
        })?;
        zones.push(Zone { key, shape });
    }
    Ok(zones)
}

/// Burns zones onto a grid; cell value `i + 1` means `zones[i]`.
pub fn rasterize_zones(
    zones: &[Zone],
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
) -> Array2<u32> {
    let mut grid = Array2::<u32>::zeros((rows, cols));

    for (index, zone) in zones.iter().enumerate() {
        let Some(bbox) = zone.shape.bounding_rect() else {
            continue;
        };
        let (c0, r0) = transform.geo_to_pixel(bbox.min().x, bbox.max().y);
        let (c1, r1) = transform.geo_to_pixel(bbox.max().x, bbox.min().y);
        let clamp = |v: f64, hi: usize| (v.max(0.0) as usize).min(hi);
        let (col_start, col_end) = (clamp(c0.min(c1).floor(), cols), clamp(c0.max(c1).ceil(), cols));
        let (row_start, row_end) = (clamp(r0.min(r1).floor(), rows), clamp(r0.max(r1).ceil(), rows));

        let id = index as u32 + 1;
        for row in row_start..row_end {
            for col in col_start..col_end {
                if grid[(row, col)] != 0 {
                    continue;
                }
                let (x, y) = transform.pixel_to_geo(col, row);
                if zone.shape.contains(&Point::new(x, y)) {
                    grid[(row, col)] = id;
                }
            }
        }
    }

    grid
}

/// Statistics of `values` within each zone, in zone order.
///
/// NaN cells are skipped. Zones without any valued cell are left out.
pub fn zonal_statistics(values: &Raster, zones: &[Zone]) -> GeoResult<Vec<ZonalRow>> {
    let (rows, cols) = values.shape();
    let grid = rasterize_zones(zones, rows, cols, values.transform());

    let mut zone_values: Vec<Vec<f64>> = vec![Vec::new(); zones.len()];
    for ((row, col), &id) in grid.indexed_iter() {
        if id == 0 {
            continue;
        }
        let v = values.data()[(row, col)];
        if !v.is_nan() {
            zone_values[id as usize - 1].push(v);
        }
    }

    let cell_area = values.cell_area();
    let mut uncovered = 0usize;
    let result: Vec<ZonalRow> = zones
        .iter()
        .zip(zone_values)
        .filter_map(|(zone, vals)| {
            if vals.is_empty() {
                uncovered += 1;
                None
            } else {
                Some(ZonalRow::from_values(zone.key.clone(), vals, cell_area))
            }
        })
        .collect();

    if uncovered > 0 {
        warn!(uncovered, zones = zones.len(), "Zones without raster coverage were omitted");
    }
    if result.is_empty() {
        return Err(GeoError::Algorithm(
            "No zone overlaps the input raster".to_string(),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};
    use pretty_assertions::assert_eq;

    fn square(key: &str, x0: f64, y0: f64, size: f64) -> Zone {
        let p = polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ];
        Zone {
            key: key.to_string(),
            shape: MultiPolygon::new(vec![p]),
        }
    }

    fn ramp() -> Raster {
        // 4x4 grid over (0,0)-(4,4), value = row * 4 + col
        let data = (0..16).map(f64::from).collect();
        Raster::from_vec(data, 4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0)).unwrap()
    }

    #[test]
    fn test_rasterize_by_cell_centre() {
        let zones = vec![square("west", 0.0, 0.0, 2.0), square("east", 2.0, 2.0, 2.0)];
        let grid = rasterize_zones(&zones, 4, 4, &GeoTransform::new(0.0, 4.0, 1.0, -1.0));

        assert_eq!(grid[(3, 0)], 1);
        assert_eq!(grid[(2, 1)], 1);
        assert_eq!(grid[(0, 3)], 2);
        assert_eq!(grid[(0, 0)], 0);
        assert_eq!(grid.iter().filter(|&&z| z == 1).count(), 4);
    }

    #[test]
    fn test_overlap_keeps_first_zone() {
        let zones = vec![square("a", 0.0, 0.0, 4.0), square("b", 0.0, 0.0, 4.0)];
        let grid = rasterize_zones(&zones, 4, 4, &GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        assert!(grid.iter().all(|&z| z == 1));
    }

    #[test]
    fn test_zonal_statistics_values() {
        // bottom-left 2x2 block: rows 2..4, cols 0..2 -> 8, 9, 12, 13
        let rows = zonal_statistics(&ramp(), &[square("55001", 0.0, 0.0, 2.0)]).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.zone, "55001");
        assert_eq!(r.count, 4);
        assert!((r.area - 4.0).abs() < f64::EPSILON);
        assert!((r.min - 8.0).abs() < f64::EPSILON);
        assert!((r.max - 13.0).abs() < f64::EPSILON);
        assert!((r.range - 5.0).abs() < f64::EPSILON);
        assert!((r.mean - 10.5).abs() < f64::EPSILON);
        assert!((r.sum - 42.0).abs() < f64::EPSILON);
        assert!((r.median - 10.5).abs() < f64::EPSILON);
        assert!((r.std - 4.25_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_zonal_skips_nodata() {
        let mut raster = ramp();
        raster.set(3, 0, f64::NAN).unwrap();
        let rows = zonal_statistics(&raster, &[square("z", 0.0, 0.0, 2.0)]).unwrap();
        assert_eq!(rows[0].count, 3);
        assert!((rows[0].median - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uncovered_zone_is_omitted() {
        let zones = vec![square("in", 0.0, 0.0, 2.0), square("out", 50.0, 50.0, 2.0)];
        let rows = zonal_statistics(&ramp(), &zones).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].zone, "in");
    }

    #[test]
    fn test_no_overlap_is_an_error() {
        let err = zonal_statistics(&ramp(), &[square("far", 100.0, 100.0, 1.0)]).unwrap_err();
        assert!(err.to_string().contains("No zone overlaps"));
    }

    #[test]
    fn test_table_file_uses_statistic_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonal_table.json");
        let table = ZonalTable {
            name: "zonal_table".to_string(),
            zone_field: "GEOID10".to_string(),
            rows: zonal_statistics(&ramp(), &[square("1", 0.0, 0.0, 2.0)]).unwrap(),
        };
        table.write(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for field in ZonalRow::FIELDS {
            assert!(json["rows"][0].get(field).is_some(), "{field}");
        }
        assert_eq!(ZonalTable::read(&path).unwrap(), table);
        assert!(table.row("1").is_some());
        assert!(table.row("2").is_none());
    }

    #[test]
    fn test_duplicate_zone_identifiers_are_rejected() {
        let fc: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"GEOID10": "1"}},
                {"type": "Feature", "geometry": null, "properties": {"GEOID10": "1"}}
            ]
        }))
        .unwrap();
        let err = zones_from_polygons(&fc, "cancer_tracts", "GEOID10").unwrap_err();
        assert!(err.to_string().contains("Duplicate zone identifier '1'"));

        let err = zones_from_polygons(&fc, "cancer_tracts", "TRACT").unwrap_err();
        assert_eq!(err.to_string(), "Field 'TRACT' not found in cancer_tracts");
    }
}
