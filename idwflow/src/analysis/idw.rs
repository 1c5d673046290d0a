//! Inverse distance weighted interpolation.
//!
//! Each output cell is the weighted mean of its nearest samples:
//!
//! ```text
//! z(x, y) = Σ(wᵢ · zᵢ) / Σ(wᵢ),  wᵢ = 1 / dᵢᵏ
//! ```

use super::raster::{Extent, GeoTransform, Raster, MAX_CELLS};
use super::vector::FeatureCollection;
use crate::errors::{GeoError, GeoResult};
use std::cmp::Ordering;

/// Cells along the shorter side of the sample extent when no cell size is set.
pub const DEFAULT_CELLS_ON_SHORT_SIDE: f64 = 250.0;

/// A sample location with its measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Measured value.
    pub value: f64,
}

impl SamplePoint {
    /// Creates a sample.
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared distance to (`x`, `y`).
    #[inline]
    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Interpolation parameters.
#[derive(Debug, Clone)]
pub struct IdwParams {
    /// Distance exponent.
    pub power: f64,
    /// Nearest samples used per cell; 0 uses every sample.
    pub neighbours: usize,
    /// A sample closer than this is copied to the cell.
    pub snap_distance: f64,
    /// Output rows.
    pub rows: usize,
    /// Output columns.
    pub cols: usize,
    /// Output transform.
    pub transform: GeoTransform,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            neighbours: 12,
            snap_distance: 1e-10,
            rows: 100,
            cols: 100,
            transform: GeoTransform::default(),
        }
    }
}

impl IdwParams {
    /// Grid covering the samples' bounding box.
    ///
    /// With no explicit `cell_size`, the shorter side of the extent is split
    /// into 250 cells; a zero-width or zero-height extent falls back to the
    /// longer side.
    pub fn covering(
        samples: &[SamplePoint],
        cell_size: Option<f64>,
        power: f64,
        neighbours: usize,
    ) -> GeoResult<Self> {
        let extent = Extent::covering(samples.iter().map(|s| (s.x, s.y)))
            .ok_or_else(|| GeoError::Algorithm("No sample points provided".to_string()))?;

        let (width, height) = (extent.width(), extent.height());
        if width <= 0.0 && height <= 0.0 {
            return Err(GeoError::Algorithm(
                "Sample points have a zero-area extent".to_string(),
            ));
        }

        let cell = match cell_size {
            Some(c) if !(c.is_finite() && c > 0.0) => {
                return Err(GeoError::InvalidParameter {
                    name: "cell_size",
                    value: c.to_string(),
                    reason: "must be a positive number".to_string(),
                })
            }
            Some(c) => c,
            None => {
                let short = if width > 0.0 && height > 0.0 {
                    width.min(height)
                } else {
                    width.max(height)
                };
                short / DEFAULT_CELLS_ON_SHORT_SIDE
            }
        };

        let cols = ((width / cell).ceil() as usize).max(1);
        let rows = ((height / cell).ceil() as usize).max(1);
        if rows.saturating_mul(cols) > MAX_CELLS {
            return Err(GeoError::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        Ok(Self {
            power,
            neighbours,
            rows,
            cols,
            transform: GeoTransform::new(extent.min_x, extent.max_y, cell, -cell),
            ..Self::default()
        })
    }
}

/// Reads the samples of `value_field` from a point collection.
///
/// Features without geometry are skipped. A feature whose value is null or
/// non-numeric is an error, as is any non-point geometry.
pub fn samples_from_points(
    points: &FeatureCollection,
    dataset: &str,
    value_field: &str,
) -> GeoResult<Vec<SamplePoint>> {
    if points.is_empty() {
        return Err(GeoError::EmptyDataset(dataset.to_string()));
    }
    points.require_field(dataset, value_field)?;

    let mut samples = Vec::with_capacity(points.len());
    for feature in &points.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let (x, y) = geometry.as_point().ok_or_else(|| GeoError::FieldType {
            dataset: dataset.to_string(),
            field: "geometry".to_string(),
            expected: "a Point",
        })?;
        let value = feature.number(value_field).ok_or_else(|| GeoError::FieldType {
            dataset: dataset.to_string(),
            field: value_field.to_string(),
            expected: "numeric",
        })?;
        samples.push(SamplePoint::new(x, y, value));
    }

    if samples.is_empty() {
        return Err(GeoError::EmptyDataset(dataset.to_string()));
    }
    Ok(samples)
}

/// Interpolates `points` onto the grid described by `params`.
pub fn idw(points: &[SamplePoint], params: &IdwParams) -> GeoResult<Raster> {
    if points.is_empty() {
        return Err(GeoError::Algorithm("No sample points provided".to_string()));
    }
    if !(params.power.is_finite() && params.power > 0.0) {
        return Err(GeoError::InvalidParameter {
            name: "power",
            value: params.power.to_string(),
            reason: "must be a positive number".to_string(),
        });
    }
    if params.rows == 0 || params.cols == 0 {
        return Err(GeoError::InvalidDimensions {
            width: params.cols,
            height: params.rows,
        });
    }

    let take = if params.neighbours == 0 {
        points.len()
    } else {
        params.neighbours.min(points.len())
    };
    let snap_sq = params.snap_distance * params.snap_distance;
    let half_power = params.power / 2.0;

    let mut data = Vec::with_capacity(params.rows * params.cols);
    let mut candidates: Vec<(f64, f64)> = Vec::with_capacity(points.len());

    for row in 0..params.rows {
        for col in 0..params.cols {
            let (cx, cy) = params.transform.pixel_to_geo(col, row);

            candidates.clear();
            candidates.extend(points.iter().map(|p| (p.dist_sq(cx, cy), p.value)));

            if take < candidates.len() {
                candidates.select_nth_unstable_by(take - 1, |a, b| a.0.total_cmp(&b.0));
                candidates.truncate(take);
            }

            let nearest = candidates
                .iter()
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            if let Some(&(dsq, value)) = nearest {
                if dsq < snap_sq {
                    data.push(value);
                    continue;
                }
            }

            // d^k computed from d² to skip the square root.
            let (sum_w, sum_wz) = candidates.iter().fold((0.0, 0.0), |(sw, swz), &(dsq, v)| {
                let w = 1.0 / dsq.powf(half_power);
                (sw + w, swz + w * v)
            });

            data.push(if sum_w > 0.0 && sum_w.is_finite() {
                sum_wz / sum_w
            } else {
                f64::NAN
            });
        }
    }

    Raster::from_vec(data, params.rows, params.cols, params.transform)
}
