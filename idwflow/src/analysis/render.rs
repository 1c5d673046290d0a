//! Map composition and image export.
//!
//! A classed-colour symbology is applied to a polygon layer, the layer is
//! drawn into the canvas described by a map template and the canvas is
//! encoded according to the output file extension.

use super::raster::{Extent, MAX_CELLS};
use super::vector::FeatureCollection;
use crate::errors::{GeoError, GeoResult};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use image::{ImageEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::Path;

/// Canvas layout of the exported map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTemplate {
    /// Canvas width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Canvas height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Blank space around the map frame, in pixels.
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Canvas fill colour.
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    /// Polygon outline colour.
    #[serde(default = "default_outline")]
    pub outline: [u8; 3],
    /// JPEG quality, 1 to 100.
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    800
}

fn default_margin() -> u32 {
    20
}

fn default_background() -> [u8; 3] {
    [255, 255, 255]
}

fn default_outline() -> [u8; 3] {
    [110, 110, 110]
}

fn default_quality() -> u8 {
    90
}

impl Default for MapTemplate {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            margin: default_margin(),
            background: default_background(),
            outline: default_outline(),
            jpeg_quality: default_quality(),
        }
    }
}

/// One class of a classed-colour renderer.
///
/// A value belongs to the class when `min <= value < max`; a missing bound
/// is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolClass {
    /// Legend label.
    #[serde(default)]
    pub label: String,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min: Option<f64>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub max: Option<f64>,
    /// Fill colour.
    pub color: [u8; 3],
}

impl SymbolClass {
    fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |m| value >= m) && self.max.map_or(true, |m| value < m)
    }
}

/// Classed-colour symbology for one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbology {
    /// Field the classes apply to.
    #[serde(default = "default_symbology_field")]
    pub field: String,
    /// Classes, checked in order.
    pub classes: Vec<SymbolClass>,
    /// Fill for null values and values outside every class.
    #[serde(default = "default_null_color")]
    pub null_color: [u8; 3],
}

fn default_symbology_field() -> String {
    super::ols::STD_RESID_FIELD.to_string()
}

fn default_null_color() -> [u8; 3] {
    [200, 200, 200]
}

impl Symbology {
    /// Seven standard-deviation classes of the standardised residual,
    /// diverging blue to red.
    pub fn standardized_residuals() -> Self {
        let class = |label: &str, min: Option<f64>, max: Option<f64>, color: [u8; 3]| SymbolClass {
            label: label.to_string(),
            min,
            max,
            color,
        };
        Self {
            field: default_symbology_field(),
            classes: vec![
                class("< -2.5 Std. Dev.", None, Some(-2.5), [69, 117, 181]),
                class("-2.5 - -1.5 Std. Dev.", Some(-2.5), Some(-1.5), [132, 158, 186]),
                class("-1.5 - -0.5 Std. Dev.", Some(-1.5), Some(-0.5), [192, 204, 190]),
                class("-0.5 - 0.5 Std. Dev.", Some(-0.5), Some(0.5), [255, 255, 191]),
                class("0.5 - 1.5 Std. Dev.", Some(0.5), Some(1.5), [250, 185, 132]),
                class("1.5 - 2.5 Std. Dev.", Some(1.5), Some(2.5), [237, 117, 81]),
                class("> 2.5 Std. Dev.", Some(2.5), None, [214, 47, 39]),
            ],
            null_color: default_null_color(),
        }
    }

    /// Fill colour of `value`.
    pub fn color_for(&self, value: Option<f64>) -> [u8; 3] {
        value
            .and_then(|v| self.classes.iter().find(|c| c.contains(v)))
            .map_or(self.null_color, |c| c.color)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> GeoResult<T> {
    let text = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| GeoError::json(path, e))
}

impl MapTemplate {
    /// Width and height inside the margin.
    fn frame(&self) -> GeoResult<(u32, u32)> {
        let (width, height) = (self.width as usize, self.height as usize);
        if width.checked_mul(height).map_or(true, |n| n > MAX_CELLS) {
            return Err(GeoError::InvalidDimensions { width, height });
        }
        let inner_w = self.width.saturating_sub(self.margin.saturating_mul(2));
        let inner_h = self.height.saturating_sub(self.margin.saturating_mul(2));
        if inner_w == 0 || inner_h == 0 {
            return Err(GeoError::InvalidParameter {
                name: "margin",
                value: self.margin.to_string(),
                reason: format!("leaves no room on a {}x{} canvas", self.width, self.height),
            });
        }
        Ok((inner_w, inner_h))
    }

    /// Reads a map template.
    pub fn read(path: &Path) -> GeoResult<Self> {
        let template: Self = read_json(path)?;
        template.frame()?;
        Ok(template)
    }
}

impl Symbology {
    /// Reads a symbology template.
    pub fn read(path: &Path) -> GeoResult<Self> {
        let symbology: Self = read_json(path)?;
        if symbology.classes.is_empty() {
            return Err(GeoError::InvalidParameter {
                name: "classes",
                value: "[]".to_string(),
                reason: "a symbology needs at least one class".to_string(),
            });
        }
        Ok(symbology)
    }
}

/// Output encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// `.jpg` or `.jpeg`
    Jpeg,
    /// `.png`
    Png,
}

impl ImageFormat {
    /// Picks the format from the extension of `path`.
    pub fn from_path(path: &Path) -> GeoResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            _ => Err(GeoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// World-to-pixel mapping that fits an extent inside the template frame.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    extent: Extent,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    fn fit(extent: Extent, template: &MapTemplate) -> GeoResult<Self> {
        let (inner_w, inner_h) = template.frame()?;
        let (inner_w, inner_h) = (f64::from(inner_w), f64::from(inner_h));
        let (w, h) = (extent.width(), extent.height());

        let scale = match (w > 0.0, h > 0.0) {
            (true, true) => (inner_w / w).min(inner_h / h),
            (true, false) => inner_w / w,
            (false, true) => inner_h / h,
            (false, false) => {
                return Err(GeoError::Algorithm(
                    "Layer extent has zero area".to_string(),
                ))
            }
        };

        let margin = f64::from(template.margin);
        Ok(Self {
            extent,
            scale,
            offset_x: margin + (inner_w - w * scale) / 2.0,
            offset_y: margin + (inner_h - h * scale) / 2.0,
        })
    }

    fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + (x - self.extent.min_x) * self.scale,
            self.offset_y + (self.extent.max_y - y) * self.scale,
        )
    }

    fn to_world(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.extent.min_x + (px - self.offset_x) / self.scale,
            self.extent.max_y - (py - self.offset_y) / self.scale,
        )
    }
}

fn fill(canvas: &mut RgbImage, view: &Viewport, shape: &MultiPolygon<f64>, color: Rgb<u8>) {
    let Some(bbox) = shape.bounding_rect() else {
        return;
    };
    let (x0, y0) = view.to_pixel(bbox.min().x, bbox.max().y);
    let (x1, y1) = view.to_pixel(bbox.max().x, bbox.min().y);
    let clamp = |v: f64, hi: u32| (v.max(0.0) as u32).min(hi);
    let (w, h) = canvas.dimensions();

    for py in clamp(y0.floor(), h)..clamp(y1.ceil(), h) {
        for px in clamp(x0.floor(), w)..clamp(x1.ceil(), w) {
            let (x, y) = view.to_world(f64::from(px) + 0.5, f64::from(py) + 0.5);
            if shape.contains(&Point::new(x, y)) {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

fn line(canvas: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let (w, h) = canvas.dimensions();
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = f64::from(i) / f64::from(steps);
        let x = (from.0 + (to.0 - from.0) * t).floor();
        let y = (from.1 + (to.1 - from.1) * t).floor();
        if x >= 0.0 && y >= 0.0 && (x as u32) < w && (y as u32) < h {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn outline(canvas: &mut RgbImage, view: &Viewport, shape: &MultiPolygon<f64>, color: Rgb<u8>) {
    for polygon in shape {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for segment in ring.lines() {
                let from = view.to_pixel(segment.start.x, segment.start.y);
                let to = view.to_pixel(segment.end.x, segment.end.y);
                line(canvas, from, to, color);
            }
        }
    }
}

/// Draws `layer` with `symbology` onto a canvas laid out by `template`.
pub fn compose_map(
    layer: &FeatureCollection,
    dataset: &str,
    symbology: &Symbology,
    template: &MapTemplate,
) -> GeoResult<RgbImage> {
    layer.require_field(dataset, &symbology.field)?;

    let shapes: Vec<(MultiPolygon<f64>, Option<f64>)> = layer
        .features
        .iter()
        .filter_map(|f| {
            let shape = f.geometry.as_ref()?.to_multi_polygon()?;
            Some((shape, f.number(&symbology.field)))
        })
        .collect();
    if shapes.is_empty() {
        return Err(GeoError::EmptyDataset(dataset.to_string()));
    }

    let extent = layer
        .extent()
        .ok_or_else(|| GeoError::EmptyDataset(dataset.to_string()))?;
    let view = Viewport::fit(extent, template)?;

    let mut canvas = RgbImage::from_pixel(template.width, template.height, Rgb(template.background));
    for (shape, value) in &shapes {
        fill(&mut canvas, &view, shape, Rgb(symbology.color_for(*value)));
    }
    for (shape, _) in &shapes {
        outline(&mut canvas, &view, shape, Rgb(template.outline));
    }
    Ok(canvas)
}

/// Encodes `canvas` to `path`, replacing any existing file.
pub fn export_image(canvas: &RgbImage, path: &Path, jpeg_quality: u8) -> GeoResult<()> {
    let format = ImageFormat::from_path(path)?;
    let file = std::fs::File::create(path).map_err(|e| GeoError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let (w, h) = canvas.dimensions();

    let encoded = match format {
        ImageFormat::Jpeg => image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut writer,
            jpeg_quality.clamp(1, 100),
        )
        .write_image(canvas.as_raw(), w, h, image::ExtendedColorType::Rgb8),
        ImageFormat::Png => image::codecs::png::PngEncoder::new(&mut writer).write_image(
            canvas.as_raw(),
            w,
            h,
            image::ExtendedColorType::Rgb8,
        ),
    };
    encoded.map_err(|source| GeoError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    std::io::Write::flush(&mut writer).map_err(|e| GeoError::io(path, e))
}
