//! Minimal GeoJSON output types (RFC 7946).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A GeoJSON feature: stored geometry plus allow-listed scalar properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: JsonValue,
    pub properties: serde_json::Map<String, JsonValue>,
}

impl Feature {
    pub fn new(geometry: JsonValue, properties: serde_json::Map<String, JsonValue>) -> Self {
        Feature {
            kind: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

/// The `FeatureCollection` wrapper returned for geospatial responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        FeatureCollection::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_serializes_with_type_tags() {
        let feature = Feature::new(json!({"type": "Point", "coordinates": [0.1, 51.5]}), {
            let mut m = serde_json::Map::new();
            m.insert("entity".to_string(), json!(7));
            m
        });
        let collection: FeatureCollection = std::iter::once(feature).collect();

        let v = serde_json::to_value(&collection).unwrap();
        assert_eq!(v["type"], json!("FeatureCollection"));
        assert_eq!(v["features"][0]["type"], json!("Feature"));
        assert_eq!(v["features"][0]["properties"]["entity"], json!(7));
    }
}
