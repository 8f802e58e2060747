//! Storage backends for entity search
//!
//! Two conformant implementations of one contract: a typed, parameter-bound
//! PostGIS adapter and a remote SQL-over-HTTP adapter. One of them is
//! constructed from configuration at startup; nothing else in the service
//! branches on the backend kind.

pub mod postgres;
pub mod remote;

pub use postgres::PostgresBackend;
pub use remote::RemoteBackend;

use crate::search::predicate::PredicateSet;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use terrier_model::EntityRow;

/// Entities per dataset, for the dataset count endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetCount {
    pub dataset: String,
    pub count: i64,
}

/// Contract implemented by both search backends.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run the compiled query, returning the page of rows and the total
    /// number of matches computed from the same filter clauses.
    async fn search(&self, predicates: &PredicateSet) -> Result<(Vec<EntityRow>, i64)>;

    /// Fetch a single entity by id.
    async fn get(&self, entity: i64) -> Result<Option<EntityRow>>;

    /// Count distinct entities per dataset, optionally restricted to one
    /// dataset.
    async fn dataset_counts(&self, dataset: Option<&str>) -> Result<Vec<DatasetCount>>;
}
