//! Georeferenced raster grid and ESRI ASCII grid I/O.

use crate::errors::{GeoError, GeoResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

/// Preferred value written for NaN cells in ASCII grids.
///
/// When a valid cell already holds this value the writer falls back to the
/// next unused value in `-99999, -999999, ...`, so NaN and real values stay
/// distinct after a round trip.
pub const ASCII_NODATA: f64 = -9999.0;

/// Largest grid, in cells, that is allocated or read.
pub const MAX_CELLS: usize = 25_000_000;

/// Axis-aligned bounding box in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl Extent {
    /// Creates an extent from its edges.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest extent covering every coordinate; `None` for no coordinates.
    pub fn covering(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        coords.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self::new(x, y, x, y),
                Some(e) => Self::new(e.min_x.min(x), e.min_y.min(y), e.max_x.max(x), e.max_y.max(y)),
            })
        })
    }

    /// Width in map units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in map units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// North-up affine transform between cell indices and map coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height   (pixel_height < 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X
    pub pixel_width: f64,
    /// Cell size in Y, negative for north-up grids
    pub pixel_height: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

impl GeoTransform {
    /// Creates a north-up transform.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinates of the centre of cell (`col`, `row`).
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Fractional (col, row) of a map coordinate.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// A georeferenced grid of `f64` cells; NaN marks nodata.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array2<f64>,
    transform: GeoTransform,
}

impl Raster {
    /// Creates a raster filled with NaN.
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), f64::NAN),
            transform,
        }
    }

    /// Creates a raster from row-major data.
    pub fn from_vec(
        data: Vec<f64>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> GeoResult<Self> {
        let array = Array2::from_shape_vec((rows, cols), data).map_err(|_| {
            GeoError::InvalidDimensions {
                width: cols,
                height: rows,
            }
        })?;
        Ok(Self {
            data: array,
            transform,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Value at (row, col), `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    /// Sets the value at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> GeoResult<()> {
        let (rows, cols) = self.shape();
        let cell = self
            .data
            .get_mut((row, col))
            .ok_or(GeoError::InvalidDimensions {
                width: cols,
                height: rows,
            })?;
        *cell = value;
        Ok(())
    }

    /// Underlying cell array.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// The affine transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Area of one cell in square map units.
    pub fn cell_area(&self) -> f64 {
        (self.transform.pixel_width * self.transform.pixel_height).abs()
    }

    /// Map extent covered by the grid.
    pub fn extent(&self) -> Extent {
        let t = &self.transform;
        let x1 = t.origin_x;
        let x2 = t.origin_x + self.cols() as f64 * t.pixel_width;
        let y1 = t.origin_y;
        let y2 = t.origin_y + self.rows() as f64 * t.pixel_height;
        Extent::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    }

    /// Number of non-NaN cells.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// First NODATA candidate that no valid cell holds.
    fn nodata_value(&self) -> f64 {
        let mut candidate = ASCII_NODATA;
        while self.data.iter().any(|v| (v - candidate).abs() < f64::EPSILON) {
            candidate = candidate * 10.0 - 9.0;
        }
        candidate
    }

    /// Writes the raster as an ESRI ASCII grid, replacing any existing file.
    pub fn write_ascii_grid(&self, path: &Path) -> GeoResult<()> {
        let t = &self.transform;
        if (t.pixel_width + t.pixel_height).abs() > f64::EPSILON * t.pixel_width.abs() * 4.0 {
            return Err(GeoError::InvalidParameter {
                name: "transform",
                value: format!("{} x {}", t.pixel_width, t.pixel_height),
                reason: "ASCII grids require square north-up cells".to_string(),
            });
        }

        let mut text = String::with_capacity(self.data.len() * 8 + 128);
        let extent = self.extent();
        // Infallible: writing into a String.
        let _ = writeln!(text, "ncols {}", self.cols());
        let _ = writeln!(text, "nrows {}", self.rows());
        let _ = writeln!(text, "xllcorner {}", extent.min_x);
        let _ = writeln!(text, "yllcorner {}", extent.min_y);
        let _ = writeln!(text, "cellsize {}", t.pixel_width);
        let nodata = self.nodata_value();
        let _ = writeln!(text, "NODATA_value {nodata}");

        for row in self.data.rows() {
            let mut first = true;
            for value in row {
                if !first {
                    text.push(' ');
                }
                first = false;
                let v = if value.is_nan() { nodata } else { *value };
                let _ = write!(text, "{v}");
            }
            text.push('\n');
        }

        let mut file = std::fs::File::create(path).map_err(|e| GeoError::io(path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| GeoError::io(path, e))
    }

    /// Reads an ESRI ASCII grid; nodata cells become NaN.
    pub fn read_ascii_grid(path: &Path) -> GeoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let malformed = |message: String| GeoError::Format {
            path: path.to_path_buf(),
            message,
        };

        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut centered = false;
        let mut cellsize = None;
        let mut nodata = None;

        let mut tokens = text.split_whitespace().peekable();
        while let Some(key) = tokens.peek() {
            if key.parse::<f64>().is_ok() {
                break;
            }
            let key = key.to_ascii_lowercase();
            tokens.next();
            let value = tokens
                .next()
                .ok_or_else(|| malformed(format!("missing value for header '{key}'")))?;
            let number: f64 = value
                .parse()
                .map_err(|_| malformed(format!("header '{key}' has non-numeric value '{value}'")))?;
            match key.as_str() {
                "ncols" => ncols = Some(dimension(&key, number).map_err(malformed)?),
                "nrows" => nrows = Some(dimension(&key, number).map_err(malformed)?),
                "xllcorner" => xll = Some(number),
                "yllcorner" => yll = Some(number),
                "xllcenter" => {
                    xll = Some(number);
                    centered = true;
                }
                "yllcenter" => yll = Some(number),
                "cellsize" => cellsize = Some(number),
                "nodata_value" => nodata = Some(number),
                other => return Err(malformed(format!("unknown header '{other}'"))),
            }
        }

        let (Some(cols), Some(rows), Some(mut x0), Some(mut y0), Some(cell)) =
            (ncols, nrows, xll, yll, cellsize)
        else {
            return Err(malformed("incomplete header".to_string()));
        };
        let cells = rows
            .checked_mul(cols)
            .filter(|&n| n > 0 && n <= MAX_CELLS && cell > 0.0)
            .ok_or(GeoError::InvalidDimensions {
                width: cols,
                height: rows,
            })?;
        if centered {
            x0 -= cell / 2.0;
            y0 -= cell / 2.0;
        }

        let mut data = Vec::with_capacity(cells);
        for token in tokens {
            let v: f64 = token
                .parse()
                .map_err(|_| malformed(format!("non-numeric cell value '{token}'")))?;
            let is_nodata = nodata.is_some_and(|nd| (v - nd).abs() < f64::EPSILON);
            data.push(if is_nodata { f64::NAN } else { v });
        }
        if data.len() != cells {
            return Err(malformed(format!(
                "expected {} cells, found {}",
                cells,
                data.len()
            )));
        }

        let transform = GeoTransform::new(x0, y0 + rows as f64 * cell, cell, -cell);
        Self::from_vec(data, rows, cols, transform)
    }
}

/// A grid dimension from a header value: a non-negative whole number.
fn dimension(key: &str, number: f64) -> Result<usize, String> {
    if number >= 0.0 && number.fract() == 0.0 && number <= usize::MAX as f64 {
        Ok(number as usize)
    } else {
        Err(format!("header '{key}' is not a cell count: {number}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_to_geo_is_cell_centre() {
        let t = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        assert_eq!(t.pixel_to_geo(0, 0), (0.5, 9.5));
        assert_eq!(t.pixel_to_geo(9, 9), (9.5, 0.5));
        assert_eq!(t.geo_to_pixel(0.5, 9.5), (0.5, 0.5));
    }

    #[test]
    fn test_extent_and_area() {
        let r = Raster::new(4, 5, GeoTransform::new(10.0, 20.0, 2.0, -2.0));
        assert_eq!(r.extent(), Extent::new(10.0, 12.0, 20.0, 20.0));
        assert!((r.cell_area() - 4.0).abs() < f64::EPSILON);
        assert_eq!(r.valid_count(), 0);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let result = Raster::from_vec(vec![1.0; 5], 2, 3, GeoTransform::default());
        assert!(matches!(result, Err(GeoError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_ascii_grid_preserves_values_and_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surface.asc");
        let mut raster = Raster::new(2, 3, GeoTransform::new(100.0, 50.0, 0.5, -0.5));
        raster.set(0, 0, 1.25).unwrap();
        raster.set(0, 1, -3.0).unwrap();
        raster.set(1, 2, 7.123_456_789).unwrap();

        raster.write_ascii_grid(&path).unwrap();
        let back = Raster::read_ascii_grid(&path).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.get(0, 0), Some(1.25));
        assert_eq!(back.get(1, 2), Some(7.123_456_789));
        assert!(back.get(0, 2).unwrap().is_nan());
        assert_eq!(back.valid_count(), 3);
    }

    #[test]
    fn test_ascii_grid_header_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.asc");
        let raster = Raster::from_vec(vec![1.0, 2.0], 1, 2, GeoTransform::new(0.0, 1.0, 1.0, -1.0))
            .unwrap();
        raster.write_ascii_grid(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ncols 2");
        assert_eq!(lines[1], "nrows 1");
        assert_eq!(lines[2], "xllcorner 0");
        assert_eq!(lines[3], "yllcorner 0");
        assert_eq!(lines[4], "cellsize 1");
        assert_eq!(lines[6], "1 2");
    }

    #[test]
    fn test_read_rejects_truncated_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.asc");
        std::fs::write(
            &path,
            "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n",
        )
        .unwrap();

        let err = Raster::read_ascii_grid(&path).unwrap_err();
        assert!(err.to_string().contains("expected 4 cells"));
    }

    #[test]
    fn test_read_rejects_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.asc");
        for (cols, rows) in [("4294967296", "4294967296"), ("100000000", "100000000")] {
            std::fs::write(
                &path,
                format!("ncols {cols}\nnrows {rows}\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n"),
            )
            .unwrap();

            let result = Raster::read_ascii_grid(&path);
            assert!(
                matches!(result, Err(GeoError::InvalidDimensions { .. })),
                "{cols} x {rows}: {result:?}"
            );
        }
    }

    #[test]
    fn test_read_rejects_fractional_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frac.asc");
        std::fs::write(
            &path,
            "ncols 2.5\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n",
        )
        .unwrap();

        let err = Raster::read_ascii_grid(&path).unwrap_err();
        assert!(err.to_string().contains("not a cell count"), "{err}");
    }

    #[test]
    fn test_nodata_sentinel_avoids_real_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.asc");
        let mut raster = Raster::new(1, 3, GeoTransform::new(0.0, 1.0, 1.0, -1.0));
        raster.set(0, 0, ASCII_NODATA).unwrap();
        raster.set(0, 1, -99_999.0).unwrap();

        raster.write_ascii_grid(&path).unwrap();
        let back = Raster::read_ascii_grid(&path).unwrap();

        assert_eq!(back.get(0, 0), Some(ASCII_NODATA));
        assert_eq!(back.get(0, 1), Some(-99_999.0));
        assert!(back.get(0, 2).unwrap().is_nan());
        assert_eq!(back.valid_count(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        let result = Raster::read_ascii_grid(Path::new("/nonexistent/idwout.asc"));
        assert!(matches!(result, Err(GeoError::Io { .. })));
    }

    #[test]
    fn test_extent_covering() {
        let e = Extent::covering([(1.0, 5.0), (-2.0, 3.0), (4.0, 8.0)]).unwrap();
        assert_eq!(e, Extent::new(-2.0, 3.0, 4.0, 8.0));
        assert!(Extent::covering(std::iter::empty()).is_none());
        assert!((e.width() - 6.0).abs() < f64::EPSILON);
    }
}
