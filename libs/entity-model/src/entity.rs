//! The catalogued entity record and its row-to-record mapping.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::geojson::Feature;

/// Output field allow-list. Anything a backend row carries outside this list
/// (and the geometry blob feeding [`Feature`] assembly) is dropped during
/// mapping.
pub const ENTITY_FIELDS: [&str; 9] = [
    "entity",
    "name",
    "reference",
    "dataset",
    "json",
    "entry_date",
    "start_date",
    "end_date",
    "typology",
];

/// Raw row as decoded by a storage backend, before allow-list mapping.
///
/// The relational backend fills this from typed columns; the remote backend
/// from a JSON row object. Empty strings from the remote store are decoded
/// as `None` so both backends agree on what "absent" means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRow {
    pub entity: i64,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub dataset: Option<String>,
    pub typology: Option<String>,
    pub json: Option<JsonValue>,
    pub entry_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Stored GeoJSON geometry blob, when the entity has one.
    pub geojson: Option<JsonValue>,
}

/// A single catalogued record: identity, dataset membership, typology,
/// date range, arbitrary payload and (optionally) an assembled GeoJSON
/// feature.
///
/// Entities are read-only projections of persisted storage; they are never
/// created or mutated here.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Entity {
    pub entity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geojson: Option<Feature>,
}

impl Entity {
    /// Map a backend row onto the output allow-list.
    ///
    /// Empty strings and empty JSON payloads are omitted. When the row
    /// carries a geometry blob, a `Feature` is assembled whose properties
    /// are the scalar allow-listed fields (the `json` payload is not
    /// unpacked into properties).
    pub fn from_row(row: EntityRow) -> Self {
        let mut entity = Entity {
            entity: row.entity,
            name: non_empty(row.name),
            reference: non_empty(row.reference),
            dataset: non_empty(row.dataset),
            typology: non_empty(row.typology),
            json: row.json.filter(|v| !v.is_null()),
            entry_date: row.entry_date,
            start_date: row.start_date,
            end_date: row.end_date,
            geojson: None,
        };

        if let Some(geometry) = row.geojson.filter(|v| !v.is_null()) {
            entity.geojson = Some(Feature::new(geometry, entity.scalar_properties()));
        }

        entity
    }

    /// The scalar allow-listed fields, for use as GeoJSON feature properties.
    fn scalar_properties(&self) -> serde_json::Map<String, JsonValue> {
        let mut properties = serde_json::Map::new();
        properties.insert("entity".to_string(), JsonValue::from(self.entity));
        insert_str(&mut properties, "name", &self.name);
        insert_str(&mut properties, "reference", &self.reference);
        insert_str(&mut properties, "dataset", &self.dataset);
        insert_str(&mut properties, "typology", &self.typology);
        insert_date(&mut properties, "entry_date", &self.entry_date);
        insert_date(&mut properties, "start_date", &self.start_date);
        insert_date(&mut properties, "end_date", &self.end_date);
        properties
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn insert_str(
    properties: &mut serde_json::Map<String, JsonValue>,
    key: &str,
    value: &Option<String>,
) {
    if let Some(v) = value {
        properties.insert(key.to_string(), JsonValue::from(v.clone()));
    }
}

fn insert_date(
    properties: &mut serde_json::Map<String, JsonValue>,
    key: &str,
    value: &Option<NaiveDate>,
) {
    if let Some(v) = value {
        properties.insert(key.to_string(), JsonValue::from(v.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> EntityRow {
        EntityRow {
            entity: 101,
            name: Some("Abbotswood open space".to_string()),
            reference: Some("Q123".to_string()),
            dataset: Some("greenspace".to_string()),
            typology: Some("geography".to_string()),
            json: Some(json!({"designation": "open-space"})),
            entry_date: NaiveDate::from_ymd_opt(2020, 1, 7),
            start_date: NaiveDate::from_ymd_opt(2019, 3, 1),
            end_date: None,
            geojson: None,
        }
    }

    #[test]
    fn empty_values_are_omitted() {
        let mut r = row();
        r.name = Some(String::new());
        r.reference = None;
        let entity = Entity::from_row(r);
        assert_eq!(entity.name, None);
        assert_eq!(entity.reference, None);

        let serialized = serde_json::to_value(&entity).unwrap();
        assert!(serialized.get("name").is_none());
        assert!(serialized.get("end_date").is_none());
        assert_eq!(serialized["dataset"], json!("greenspace"));
    }

    #[test]
    fn feature_is_assembled_from_geometry_blob() {
        let mut r = row();
        r.geojson = Some(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        let entity = Entity::from_row(r);

        let feature = entity.geojson.as_ref().expect("feature");
        assert_eq!(feature.geometry["type"], json!("Polygon"));
        assert_eq!(feature.properties["entity"], json!(101));
        assert_eq!(feature.properties["dataset"], json!("greenspace"));
        assert_eq!(feature.properties["entry_date"], json!("2020-01-07"));
        // the payload blob never becomes a property
        assert!(feature.properties.get("json").is_none());
    }

    #[test]
    fn no_geometry_means_no_feature() {
        let entity = Entity::from_row(row());
        assert!(entity.geojson.is_none());
    }
}
