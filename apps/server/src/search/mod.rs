//! Entity search engine
//!
//! Normalizes filter parameters, compiles them into backend-agnostic
//! predicates, executes them against the configured backend and maps the
//! resulting rows into typed entities.

pub mod backend;
pub mod escape;
pub mod params;
pub mod predicate;
pub mod relation;

pub use backend::{DatasetCount, PostgresBackend, RemoteBackend, SearchBackend};
pub use params::SearchParameters;
pub use relation::SpatialRelation;

use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use terrier_model::{Entity, FeatureCollection};

/// One page of search results with its total count and the normalized
/// parameters that produced it.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub params: SearchParameters,
    pub count: i64,
    pub entities: Vec<Entity>,
}

impl SearchResult {
    /// The geospatial representation: one feature per entity with geometry.
    pub fn feature_collection(&self) -> FeatureCollection {
        self.entities
            .iter()
            .filter_map(|e| e.geojson.clone())
            .collect()
    }
}

/// The search engine facade held in application state.
///
/// All request-scoped objects (parameters, predicates) are created per call
/// and discarded with the response; the engine itself only owns the backend
/// handle.
pub struct SearchEngine {
    backend: Arc<dyn SearchBackend>,
}

impl SearchEngine {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Run a search from raw query pairs.
    pub async fn search(&self, pairs: &[(String, String)]) -> Result<SearchResult> {
        let params = SearchParameters::from_pairs(pairs);
        let predicates = predicate::compile(&params)?;

        let (rows, count) = self.backend.search(&predicates).await?;
        let entities: Vec<Entity> = rows.into_iter().map(Entity::from_row).collect();

        tracing::debug!(count, page = entities.len(), "entity search complete");
        Ok(SearchResult {
            params,
            count,
            entities,
        })
    }

    /// Fetch a single entity by id.
    pub async fn get(&self, entity: i64) -> Result<Option<Entity>> {
        let row = self.backend.get(entity).await?;
        Ok(row.map(Entity::from_row))
    }

    /// Count distinct entities per dataset.
    pub async fn dataset_counts(&self, dataset: Option<&str>) -> Result<Vec<DatasetCount>> {
        self.backend.dataset_counts(dataset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::predicate::PredicateSet;
    use crate::Error;
    use async_trait::async_trait;
    use terrier_model::EntityRow;

    /// In-memory backend: applies only the page limit, reports the full
    /// fixture size as the count.
    struct FixtureBackend {
        rows: Vec<EntityRow>,
    }

    #[async_trait]
    impl SearchBackend for FixtureBackend {
        async fn search(&self, predicates: &PredicateSet) -> Result<(Vec<EntityRow>, i64)> {
            let count = self.rows.len() as i64;
            let rows = self
                .rows
                .iter()
                .take(predicates.page.limit)
                .cloned()
                .collect();
            Ok((rows, count))
        }

        async fn get(&self, entity: i64) -> Result<Option<EntityRow>> {
            Ok(self.rows.iter().find(|r| r.entity == entity).cloned())
        }

        async fn dataset_counts(&self, _dataset: Option<&str>) -> Result<Vec<DatasetCount>> {
            Ok(Vec::new())
        }
    }

    fn engine(rows: Vec<EntityRow>) -> SearchEngine {
        SearchEngine::new(Arc::new(FixtureBackend { rows }))
    }

    fn row(entity: i64, dataset: &str) -> EntityRow {
        EntityRow {
            entity,
            dataset: Some(dataset.to_string()),
            typology: Some("geography".to_string()),
            ..Default::default()
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn search_maps_rows_and_echoes_normalized_params() {
        let engine = engine(vec![row(1, "greenspace"), row(2, "brownfield-site")]);
        let result = engine
            .search(&pairs(&[
                ("dataset", "greenspace"),
                ("dataset", "brownfield-site"),
                ("dataset", "greenspace"),
            ]))
            .await
            .unwrap();

        assert_eq!(result.count, 2);
        assert_eq!(
            result.params.dataset,
            vec!["brownfield-site", "greenspace"]
        );
        assert_eq!(result.entities[0].entity, 1);
        assert_eq!(result.entities[1].dataset.as_deref(), Some("brownfield-site"));
    }

    #[tokio::test]
    async fn page_is_bounded_by_limit_with_ascending_ids() {
        let rows: Vec<EntityRow> = (1..=12).map(|id| row(id, "forest")).collect();
        let engine = engine(rows);

        let result = engine.search(&[]).await.unwrap();
        assert_eq!(result.params.limit, 10);
        assert_eq!(result.entities.len(), 10);
        assert_eq!(result.count, 12);
        assert!(result
            .entities
            .windows(2)
            .all(|w| w[0].entity < w[1].entity));
    }

    #[tokio::test]
    async fn invalid_relation_fails_before_the_backend_runs() {
        let engine = engine(vec![row(1, "greenspace")]);
        let err = engine
            .search(&pairs(&[("geometry_relation", "drop table")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRelation { .. }));
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_entity() {
        let engine = engine(vec![row(7, "greenspace")]);
        assert!(engine.get(7).await.unwrap().is_some());
        assert!(engine.get(8).await.unwrap().is_none());
    }
}
