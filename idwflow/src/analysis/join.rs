//! Attribute join of a statistics table onto a layer.

use super::vector::{Feature, FeatureCollection};
use super::zonal::{ZonalRow, ZonalTable};
use crate::errors::{GeoError, GeoResult};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Outcome of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedLayer {
    /// Every target feature with qualified fields.
    pub layer: FeatureCollection,
    /// Target features that found a table row.
    pub matched: usize,
}

/// Qualified field name: `<dataset>.<field>`.
pub fn qualify(dataset: &str, field: &str) -> String {
    format!("{dataset}.{field}")
}

/// Left outer join of `table` onto `target`, keyed by `key_field` on both.
///
/// Every target feature is kept. Target fields are renamed to
/// `<target_name>.<field>` and table fields to `<table.name>.<field>`;
/// features without a matching row get nulls for the table fields.
pub fn join_table(
    target: &FeatureCollection,
    target_name: &str,
    table: &ZonalTable,
    key_field: &str,
) -> GeoResult<JoinedLayer> {
    target.require_field(target_name, key_field)?;
    if table.zone_field != key_field {
        return Err(GeoError::missing_field(&table.name, key_field));
    }

    let rows: HashMap<&str, &ZonalRow> = table.rows.iter().map(|r| (r.zone.as_str(), r)).collect();
    let table_key = qualify(&table.name, key_field);

    let mut matched = 0usize;
    let features = target
        .features
        .iter()
        .map(|feature| {
            let mut properties: Map<String, Value> = feature
                .properties
                .iter()
                .map(|(k, v)| (qualify(target_name, k), v.clone()))
                .collect();

            match feature.key(key_field).and_then(|k| rows.get(k.as_str()).copied()) {
                Some(row) => {
                    matched += 1;
                    properties.insert(table_key.clone(), Value::String(row.zone.clone()));
                    for (field, value) in row.values() {
                        properties.insert(qualify(&table.name, field), number(value));
                    }
                }
                None => {
                    properties.insert(table_key.clone(), Value::Null);
                    for field in ZonalRow::FIELDS {
                        properties.insert(qualify(&table.name, field), Value::Null);
                    }
                }
            }

            Feature {
                properties,
                ..feature.clone()
            }
        })
        .collect();

    if matched == 0 {
        return Err(GeoError::Algorithm(format!(
            "No {key_field} values of {target_name} match {}",
            table.name
        )));
    }

    let mut layer = FeatureCollection::new(features);
    layer.foreign_members = target.foreign_members.clone();
    Ok(JoinedLayer { layer, matched })
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}
