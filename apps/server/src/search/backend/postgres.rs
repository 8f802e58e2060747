//! Typed search backend against PostGIS
//!
//! Every predicate is rendered as a parameter-bound condition on typed
//! columns; no request value is ever interpolated into the SQL text. The
//! total count is computed with a window function in the same query as the
//! page, so count and page always come from one consistent snapshot.

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::{DatasetCount, SearchBackend};
use crate::config::DatabaseConfig;
use crate::search::predicate::{
    GeometrySource, PageCursor, Predicate, PredicateSet,
};
use crate::search::relation::SpatialRelation;
use crate::{Error, Result};
use async_trait::async_trait;
use terrier_model::EntityRow;

const SELECT_COLUMNS: &str = "entity.entity, entity.name, entity.reference, entity.dataset, \
     entity.typology, entity.json, entity.entry_date, entity.start_date, entity.end_date, \
     entity.geojson";

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i64),
    Date(chrono::NaiveDate),
    TextArray(Vec<String>),
    IntArray(Vec<i64>),
}

fn push_bind(bind_params: &mut Vec<BindValue>, value: BindValue) -> usize {
    bind_params.push(value);
    bind_params.len()
}

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Build the process-wide connection pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(Error::Database)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self, sql: &str, bind_params: Vec<BindValue>) -> Result<Vec<PgRow>> {
        let mut query = sqlx::query(sql);
        for value in bind_params {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::Int(v) => query.bind(v),
                BindValue::Date(v) => query.bind(v),
                BindValue::TextArray(vs) => query.bind(vs),
                BindValue::IntArray(vs) => query.bind(vs),
            };
        }
        query.fetch_all(&self.pool).await.map_err(Error::Database)
    }
}

#[async_trait]
impl SearchBackend for PostgresBackend {
    async fn search(&self, predicates: &PredicateSet) -> Result<(Vec<EntityRow>, i64)> {
        let (sql, bind_params) = build_sql(predicates);
        let rows = self.fetch_all(&sql, bind_params).await?;

        let count = match rows.first() {
            Some(row) => row.try_get::<i64, _>("count_all").map_err(Error::Database)?,
            None => 0,
        };
        let entities = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<EntityRow>>>()?;
        Ok((entities, count))
    }

    async fn get(&self, entity: i64) -> Result<Option<EntityRow>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM entity WHERE entity.entity = $1");
        let row = sqlx::query(&sql)
            .bind(entity)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn dataset_counts(&self, dataset: Option<&str>) -> Result<Vec<DatasetCount>> {
        let mut sql = String::from(
            "SELECT entity.dataset, COUNT(DISTINCT entity.entity) AS _count \
             FROM entity WHERE entity.dataset IS NOT NULL",
        );
        if dataset.is_some() {
            sql.push_str(" AND entity.dataset = $1");
        }
        sql.push_str(" GROUP BY entity.dataset ORDER BY entity.dataset");

        let mut query = sqlx::query(&sql);
        if let Some(dataset) = dataset {
            query = query.bind(dataset);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                Ok(DatasetCount {
                    dataset: row.try_get("dataset").map_err(Error::Database)?,
                    count: row.try_get("_count").map_err(Error::Database)?,
                })
            })
            .collect()
    }
}

/// Build the page query: filters, cursor, ordering and the window-function
/// count in a single statement.
pub(crate) fn build_sql(predicates: &PredicateSet) -> (String, Vec<BindValue>) {
    let mut bind_params = Vec::new();
    let mut sql = format!("SELECT {SELECT_COLUMNS}, COUNT(*) OVER () AS count_all FROM entity");

    let mut clauses: Vec<String> = predicates
        .filters
        .iter()
        .map(|p| build_filter_clause(p, &mut bind_params))
        .collect();
    if let Some(PageCursor::After(id)) = predicates.page.cursor {
        let idx = push_bind(&mut bind_params, BindValue::Int(id));
        clauses.push(format!("entity.entity > ${idx}"));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(" ORDER BY entity.entity");
    let idx = push_bind(&mut bind_params, BindValue::Int(predicates.page.limit as i64));
    sql.push_str(&format!(" LIMIT ${idx}"));
    if let Some(PageCursor::Offset(offset)) = predicates.page.cursor {
        let idx = push_bind(&mut bind_params, BindValue::Int(offset as i64));
        sql.push_str(&format!(" OFFSET ${idx}"));
    }

    (sql, bind_params)
}

fn build_filter_clause(predicate: &Predicate, bind_params: &mut Vec<BindValue>) -> String {
    match predicate {
        Predicate::TextIn { column, values } => {
            let idx = push_bind(bind_params, BindValue::TextArray(values.clone()));
            format!("entity.{} = ANY(${idx})", column.name())
        }
        Predicate::EntityIn { ids } => {
            let idx = push_bind(bind_params, BindValue::IntArray(ids.clone()));
            format!("entity.entity = ANY(${idx})")
        }
        Predicate::CurieAny { curies } => {
            let parts: Vec<String> = curies
                .iter()
                .map(|curie| {
                    let p_idx = push_bind(bind_params, BindValue::Text(curie.prefix.clone()));
                    let r_idx = push_bind(bind_params, BindValue::Text(curie.reference.clone()));
                    format!("(entity.prefix = ${p_idx} AND entity.reference = ${r_idx})")
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::EndDate { present } => {
            if *present {
                "entity.end_date IS NOT NULL".to_string()
            } else {
                "entity.end_date IS NULL".to_string()
            }
        }
        Predicate::DateEmpty { column } => format!("entity.{} IS NULL", column.name()),
        Predicate::DateCmp { column, op, value } => {
            let idx = push_bind(bind_params, BindValue::Date(*value));
            format!("entity.{} {} ${idx}", column.name(), op.sql())
        }
        Predicate::Spatial { relation, sources } => {
            let parts: Vec<String> = sources
                .iter()
                .map(|source| build_spatial_clause(*relation, source, bind_params))
                .collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

fn build_spatial_clause(
    relation: SpatialRelation,
    source: &GeometrySource,
    bind_params: &mut Vec<BindValue>,
) -> String {
    match source {
        GeometrySource::Point { wkt } => {
            // A point strictly inside a stored polygon must satisfy `within`;
            // tested as containment of the point inside the stored column.
            let function = match relation {
                SpatialRelation::Within => "ST_Contains",
                _ => relation.postgis_function(),
            };
            let idx = push_bind(bind_params, BindValue::Text(wkt.clone()));
            column_disjunction(function, &format!("ST_GeomFromText(${idx}, 4326)"))
        }
        GeometrySource::Wkt(wkt) => {
            let idx = push_bind(bind_params, BindValue::Text(wkt.clone()));
            column_disjunction(
                relation.postgis_function(),
                &format!("ST_GeomFromText(${idx}, 4326)"),
            )
        }
        GeometrySource::EntityGeometry(entity) => {
            let idx = push_bind(bind_params, BindValue::Int(*entity));
            column_disjunction(
                relation.postgis_function(),
                &format!("(SELECT g.geometry FROM entity g WHERE g.entity = ${idx})"),
            )
        }
        // Resolved geometries are always tested by intersection, whatever
        // relation the other sources use.
        GeometrySource::ReferenceGeometry(reference) => {
            let idx = push_bind(bind_params, BindValue::Text(reference.clone()));
            format!(
                "EXISTS (SELECT 1 FROM entity g WHERE g.reference = ${idx} \
                 AND g.geometry IS NOT NULL \
                 AND ((entity.geometry IS NOT NULL AND ST_Intersects(entity.geometry, g.geometry)) \
                 OR (entity.point IS NOT NULL AND ST_Intersects(entity.point, g.geometry))))"
            )
        }
    }
}

fn column_disjunction(function: &str, value: &str) -> String {
    format!(
        "((entity.geometry IS NOT NULL AND {function}(entity.geometry, {value})) \
         OR (entity.point IS NOT NULL AND {function}(entity.point, {value})))"
    )
}

fn decode_row(row: &PgRow) -> Result<EntityRow> {
    Ok(EntityRow {
        entity: row.try_get("entity").map_err(Error::Database)?,
        name: row.try_get("name").map_err(Error::Database)?,
        reference: row.try_get("reference").map_err(Error::Database)?,
        dataset: row.try_get("dataset").map_err(Error::Database)?,
        typology: row.try_get("typology").map_err(Error::Database)?,
        json: row.try_get("json").map_err(Error::Database)?,
        entry_date: row.try_get("entry_date").map_err(Error::Database)?,
        start_date: row.try_get("start_date").map_err(Error::Database)?,
        end_date: row.try_get("end_date").map_err(Error::Database)?,
        geojson: row.try_get("geojson").map_err(Error::Database)?,
    })
}
