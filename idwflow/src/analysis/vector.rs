//! GeoJSON feature collections.
//!
//! Only the geometry types the pipeline consumes are modelled. Coordinates
//! are planar; any third ordinate is carried through but ignored.

use super::raster::Extent;
use crate::errors::{GeoError, GeoResult};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// A GeoJSON position, `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// Supported GeoJSON geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// Exterior ring followed by holes.
    Polygon(Vec<Vec<Position>>),
    /// One or more polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

fn coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn ring(positions: &[Position]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    let holes = holes.iter().map(|r| ring(r)).collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(ring(exterior)?, holes))
}

impl Geometry {
    /// Returns the `(x, y)` of a point geometry.
    pub fn as_point(&self) -> Option<(f64, f64)> {
        match self {
            Self::Point(p) => coord(p).map(|c| (c.x, c.y)),
            _ => None,
        }
    }

    /// Converts an areal geometry into a `geo` multipolygon.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Self::Point(_) => None,
            Self::Polygon(rings) => polygon(rings).map(|p| MultiPolygon::new(vec![p])),
            Self::MultiPolygon(polys) => polys
                .iter()
                .map(|p| polygon(p))
                .collect::<Option<Vec<_>>>()
                .map(MultiPolygon::new),
        }
    }

    /// All planar coordinates of the geometry.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        let xy = |p: &Position| coord(p).map(|c| (c.x, c.y));
        match self {
            Self::Point(p) => xy(p).into_iter().collect(),
            Self::Polygon(rings) => rings.iter().flatten().filter_map(xy).collect(),
            Self::MultiPolygon(polys) => polys.iter().flatten().flatten().filter_map(xy).collect(),
        }
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

fn properties_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    /// Optional feature identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// The geometry, possibly null.
    pub geometry: Option<Geometry>,
    /// Attribute table row.
    #[serde(default, deserialize_with = "properties_or_empty")]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Creates a feature with the given geometry and attributes.
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry,
            properties,
        }
    }

    /// Returns an attribute value.
    pub fn property(&self, field: &str) -> Option<&Value> {
        self.properties.get(field)
    }

    /// Returns a numeric attribute; `None` for absent, null or non-numeric.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.property(field).and_then(Value::as_f64)
    }

    /// Returns an identifier attribute as a string.
    ///
    /// Strings are taken as-is and integers are formatted in decimal, so a
    /// `GEOID10` stored either way compares equal.
    pub fn key(&self, field: &str) -> Option<String> {
        match self.property(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    /// The features.
    pub features: Vec<Feature>,
    /// Unrecognised top-level members, kept verbatim.
    #[serde(flatten)]
    pub foreign_members: Map<String, Value>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    /// Creates a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
            foreign_members: Map::new(),
        }
    }

    /// Reads a collection from a GeoJSON file.
    pub fn read(path: &Path) -> GeoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let collection: Self =
            serde_json::from_str(&text).map_err(|e| GeoError::json(path, e))?;
        if collection.kind != "FeatureCollection" {
            return Err(GeoError::Format {
                path: path.to_path_buf(),
                message: format!("expected a FeatureCollection, found '{}'", collection.kind),
            });
        }
        Ok(collection)
    }

    /// Writes the collection, replacing any existing file.
    pub fn write(&self, path: &Path) -> GeoResult<()> {
        let text = serde_json::to_string(self).map_err(|e| GeoError::json(path, e))?;
        std::fs::write(path, text).map_err(|e| GeoError::io(path, e))
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns true if at least one feature carries `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.features.iter().any(|f| f.properties.contains_key(field))
    }

    /// Fails with [`GeoError::MissingField`] unless some feature carries `field`.
    pub fn require_field(&self, dataset: &str, field: &str) -> GeoResult<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(GeoError::missing_field(dataset, field))
        }
    }

    /// Extent of every geometry in the collection.
    pub fn extent(&self) -> Option<Extent> {
        Extent::covering(
            self.features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .flat_map(Geometry::coordinates),
        )
    }
}

/// Dataset name of a file: its stem, as used to qualify joined fields.
pub fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_collection_with_foreign_members() {
        let text = json!({
            "type": "FeatureCollection",
            "name": "cancer_tracts",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]},
                "properties": {"GEOID10": "55001", "canrate": 0.12}
            }]
        });
        let fc: FeatureCollection = serde_json::from_value(text).unwrap();

        assert_eq!(fc.len(), 1);
        assert_eq!(fc.foreign_members["name"], "cancer_tracts");
        assert_eq!(fc.features[0].key("GEOID10").as_deref(), Some("55001"));
        assert_eq!(fc.features[0].number("canrate"), Some(0.12));
        assert!(fc.has_field("canrate"));
        assert!(!fc.has_field("MEAN"));
    }

    #[test]
    fn test_null_properties_and_geometry() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "geometry": null, "properties": null}]
        }))
        .unwrap();
        assert!(fc.features[0].geometry.is_none());
        assert!(fc.features[0].properties.is_empty());
        assert!(fc.extent().is_none());
    }

    #[test]
    fn test_integer_keys_format_as_strings() {
        let feature = Feature::new(None, json!({"id": 55001, "f": 1.5}).as_object().unwrap().clone());
        assert_eq!(feature.key("id").as_deref(), Some("55001"));
        assert_eq!(feature.key("f"), None);
        assert_eq!(feature.key("missing"), None);
    }

    #[test]
    fn test_geometry_conversion() {
        let point = Geometry::Point(vec![3.0, 4.0, 100.0]);
        assert_eq!(point.as_point(), Some((3.0, 4.0)));
        assert!(point.to_multi_polygon().is_none());

        let square = Geometry::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![2.0, 2.0],
            vec![0.0, 2.0],
            vec![0.0, 0.0],
        ]]);
        let mp = square.to_multi_polygon().unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);

        let broken = Geometry::Polygon(vec![vec![vec![0.0]]]);
        assert!(broken.to_multi_polygon().is_none());
    }

    #[test]
    fn test_unsupported_geometry_is_rejected() {
        let result: Result<Geometry, _> =
            serde_json::from_value(json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.geojson");
        let mut fc = FeatureCollection::new(vec![Feature::new(
            Some(Geometry::Point(vec![1.0, 2.0])),
            Map::new(),
        )]);
        fc.foreign_members.insert("regression".to_string(), json!({"n": 1}));

        fc.write(&path).unwrap();
        let back = FeatureCollection::read(&path).unwrap();
        assert_eq!(back, fc);
        assert_eq!(back.extent(), Some(Extent::new(1.0, 2.0, 1.0, 2.0)));
    }

    #[test]
    fn test_read_rejects_non_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.geojson");
        std::fs::write(&path, r#"{"type": "Feature", "features": []}"#).unwrap();
        assert!(matches!(FeatureCollection::read(&path), Err(GeoError::Format { .. })));
    }

    #[test]
    fn test_require_field_names_dataset() {
        let fc = FeatureCollection::default();
        let err = fc.require_field("cancer_tracts", "GEOID10").unwrap_err();
        assert_eq!(err.to_string(), "Field 'GEOID10' not found in cancer_tracts");
    }

    #[test]
    fn test_dataset_name_is_stem() {
        assert_eq!(dataset_name(Path::new("/ws/zonal_table.json")), "zonal_table");
        assert_eq!(dataset_name(Path::new("cancer_tracts.geojson")), "cancer_tracts");
    }
}
