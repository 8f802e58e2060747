//! Terrier - geospatial entity search service
//!
//! An HTTP service answering faceted, geospatial search queries over a large
//! catalogue of entities, with:
//! - A canonical filter-parameter normalizer
//! - A backend-agnostic search predicate compiler
//! - Two interchangeable storage backends (PostGIS and a remote
//!   SQL-over-HTTP JSON API)
//! - JSON and GeoJSON result representations

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod search;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
