//! Remote search backend over a SQL-over-HTTP JSON API
//!
//! The remote service executes SQL received as a `sql` query parameter and
//! returns `{"rows": [...]}`. There is no bind-parameter mechanism across
//! this boundary, so predicates are rendered into one SQL text string and
//! every free-text value passes through [`sqlescape`] on the way in.

use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{DatasetCount, SearchBackend};
use crate::config::RemoteConfig;
use crate::search::escape::sqlescape;
use crate::search::predicate::{
    GeometrySource, PageCursor, Predicate, PredicateSet,
};
use crate::search::relation::SpatialRelation;
use crate::{Error, Result};
use async_trait::async_trait;
use terrier_model::EntityRow;

pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteBackend {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn query_url(&self, sql: &str) -> Result<url::Url> {
        url::Url::parse_with_params(&format!("{}/entity.json", self.base_url), &[("sql", sql)])
            .map_err(|e| Error::Validation(format!("invalid remote query URL: {e}")))
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<JsonValue>> {
        let url = self.query_url(sql)?;
        tracing::debug!(url = %url, "remote search query");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::RemoteStatus {
                status: response.status().as_u16(),
            });
        }

        let body: JsonValue = response.json().await?;
        Ok(body
            .get("rows")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SearchBackend for RemoteBackend {
    /// Two sequential round trips: the count query, then the page query.
    /// They share no transaction, so writes landing in between can make the
    /// reported count and the returned page diverge. This is an accepted,
    /// documented inconsistency window, not something to mask here.
    async fn search(&self, predicates: &PredicateSet) -> Result<(Vec<EntityRow>, i64)> {
        let count_rows = self.fetch_rows(&build_count_sql(predicates)).await?;
        let count = count_rows
            .first()
            .and_then(|row| row.get("_count"))
            .and_then(json_i64)
            .unwrap_or(0);

        let rows = self.fetch_rows(&build_sql(predicates)).await?;
        let entities = rows.iter().filter_map(decode_row).collect();
        Ok((entities, count))
    }

    async fn get(&self, entity: i64) -> Result<Option<EntityRow>> {
        let sql = format!("{SELECT_FROM} WHERE entity.entity = {entity} LIMIT 1");
        let rows = self.fetch_rows(&sql).await?;
        Ok(rows.first().and_then(decode_row))
    }

    async fn dataset_counts(&self, dataset: Option<&str>) -> Result<Vec<DatasetCount>> {
        let mut sql = String::from(
            "SELECT entity.dataset, COUNT(DISTINCT entity.entity) AS _count \
             FROM entity WHERE entity.dataset != ''",
        );
        if let Some(dataset) = dataset {
            sql.push_str(&format!(" AND entity.dataset = '{}'", sqlescape(dataset)));
        }
        sql.push_str(" GROUP BY entity.dataset ORDER BY entity.dataset");

        let rows = self.fetch_rows(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(DatasetCount {
                    dataset: row.get("dataset")?.as_str()?.to_string(),
                    count: row.get("_count").and_then(json_i64)?,
                })
            })
            .collect())
    }
}

const SELECT_FROM: &str = "SELECT entity.*, geometry.geojson FROM entity \
     LEFT OUTER JOIN geometry ON entity.entity = geometry.entity";

/// Render the page query.
pub(crate) fn build_sql(predicates: &PredicateSet) -> String {
    let mut sql = String::from(SELECT_FROM);

    let mut clauses = build_filter_clauses(&predicates.filters);
    if let Some(PageCursor::After(id)) = predicates.page.cursor {
        clauses.push(format!("entity.entity > {id}"));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(" ORDER BY entity.entity");
    sql.push_str(&format!(" LIMIT {}", predicates.page.limit));
    if let Some(PageCursor::Offset(offset)) = predicates.page.cursor {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}

/// Render the count query: the same filter clauses, no pagination, so the
/// count stays independent of limit/offset/cursor.
pub(crate) fn build_count_sql(predicates: &PredicateSet) -> String {
    let mut sql = String::from(
        "SELECT DISTINCT COUNT(*) AS _count FROM entity \
         LEFT OUTER JOIN geometry ON entity.entity = geometry.entity",
    );
    let clauses = build_filter_clauses(&predicates.filters);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql
}

fn build_filter_clauses(filters: &[Predicate]) -> Vec<String> {
    filters.iter().map(build_filter_clause).collect()
}

fn build_filter_clause(predicate: &Predicate) -> String {
    match predicate {
        Predicate::TextIn { column, values } => {
            let parts: Vec<String> = values
                .iter()
                .map(|value| format!("entity.{} = '{}'", column.name(), sqlescape(value)))
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::EntityIn { ids } => {
            let parts: Vec<String> = ids
                .iter()
                .map(|id| format!("entity.entity = {id}"))
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::CurieAny { curies } => {
            let parts: Vec<String> = curies
                .iter()
                .map(|curie| {
                    format!(
                        "(entity.prefix = '{}' AND entity.reference = '{}')",
                        sqlescape(&curie.prefix),
                        sqlescape(&curie.reference)
                    )
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        // The remote store renders absent dates as empty strings, not NULL.
        Predicate::EndDate { present } => {
            if *present {
                "entity.end_date is not ''".to_string()
            } else {
                "entity.end_date is ''".to_string()
            }
        }
        Predicate::DateEmpty { column } => format!("entity.{} = ''", column.name()),
        Predicate::DateCmp { column, op, value } => format!(
            "(entity.{col} != '' AND entity.{col} {op} '{value}')",
            col = column.name(),
            op = op.sql(),
        ),
        Predicate::Spatial { relation, sources } => {
            let parts: Vec<String> = sources
                .iter()
                .map(|source| build_spatial_clause(*relation, source))
                .collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

fn build_spatial_clause(relation: SpatialRelation, source: &GeometrySource) -> String {
    let (function, value) = match source {
        GeometrySource::Point { wkt } => {
            // A point strictly inside a stored polygon must satisfy `within`;
            // tested as containment of the point inside the stored column.
            let function = match relation {
                SpatialRelation::Within => "Contains",
                _ => relation.remote_function(),
            };
            (function, format!("GeomFromText('{}')", sqlescape(wkt)))
        }
        GeometrySource::Wkt(wkt) => (
            relation.remote_function(),
            format!("GeomFromText('{}')", sqlescape(wkt)),
        ),
        GeometrySource::EntityGeometry(entity) => (
            relation.remote_function(),
            format!("(SELECT geometry_geom FROM geometry WHERE entity = {entity})"),
        ),
        // Resolved geometries are always tested by intersection.
        GeometrySource::ReferenceGeometry(reference) => (
            "Intersects",
            format!(
                "(SELECT geometry_geom FROM geometry WHERE entity = \
                 (SELECT entity FROM entity WHERE reference = '{}' GROUP BY entity))",
                sqlescape(reference)
            ),
        ),
    };

    format!(
        "((geometry.geometry_geom IS NOT NULL AND {function}(geometry.geometry_geom, {value})) \
         OR (geometry.point_geom IS NOT NULL AND {function}(geometry.point_geom, {value})))"
    )
}

fn json_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_string(row: &JsonValue, key: &str) -> Option<String> {
    row.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn json_date(row: &JsonValue, key: &str) -> Option<chrono::NaiveDate> {
    row.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// The remote store returns JSON blobs as text columns; decode them back
/// into values.
fn json_payload(value: Option<&JsonValue>) -> Option<JsonValue> {
    match value? {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => serde_json::from_str(s).ok(),
        other => Some(other.clone()),
    }
}

fn decode_row(row: &JsonValue) -> Option<EntityRow> {
    Some(EntityRow {
        entity: row.get("entity").and_then(json_i64)?,
        name: json_string(row, "name"),
        reference: json_string(row, "reference"),
        dataset: json_string(row, "dataset"),
        typology: json_string(row, "typology"),
        json: json_payload(row.get("json")),
        entry_date: json_date(row, "entry_date"),
        start_date: json_date(row, "start_date"),
        end_date: json_date(row, "end_date"),
        geojson: json_payload(row.get("geojson")),
    })
}
