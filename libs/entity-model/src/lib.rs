//! Entity data models
//!
//! This crate provides the typed `Entity` record returned by the terrier
//! search service, the raw `EntityRow` produced by the storage backends, and
//! the GeoJSON `Feature`/`FeatureCollection` assembly used for geospatial
//! responses.
//!
//! # Design Philosophy
//!
//! - **Allow-listed output**: only the fields in [`entity::ENTITY_FIELDS`]
//!   ever leave the storage layer; empty values are omitted, not serialized
//!   as `""`/`null`
//! - **Backend-agnostic**: both the relational and the remote backend decode
//!   into the same `EntityRow`, so mapping lives in one place
//! - **Flexible**: the `json` payload stays a `serde_json::Value`

pub mod entity;
pub mod geojson;

pub use entity::{Entity, EntityRow, ENTITY_FIELDS};
pub use geojson::{Feature, FeatureCollection};
