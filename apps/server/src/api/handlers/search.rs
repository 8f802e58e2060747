//! Entity search handlers
//!
//! The same search runs behind two representations: plain JSON
//! (`/entity`, `/entity.json`) and a GeoJSON `FeatureCollection`
//! (`/entity.geojson`).

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
};

use crate::search::SearchResult;
use crate::state::AppState;
use crate::Result;

/// GET /entity and GET /entity.json
pub async fn search_json(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResult>> {
    let pairs = parse_query_pairs(query.as_deref());
    let result = state.engine.search(&pairs).await?;
    Ok(Json(result))
}

/// GET /entity.geojson
pub async fn search_geojson(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let pairs = parse_query_pairs(query.as_deref());
    let result = state.engine.search(&pairs).await?;

    let mut response = Json(result.feature_collection()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/geo+json"),
    );
    Ok(response)
}

/// Decode the raw query string into (name, value) pairs, preserving
/// repeated keys. `url::form_urlencoded` implements querystring semantics
/// (including '+' = space).
fn parse_query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_query_pairs;

    #[test]
    fn repeated_keys_are_preserved() {
        let pairs = parse_query_pairs(Some("dataset=greenspace&dataset=forest&limit=5"));
        assert_eq!(
            pairs,
            vec![
                ("dataset".to_string(), "greenspace".to_string()),
                ("dataset".to_string(), "forest".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn percent_and_plus_decode() {
        let pairs = parse_query_pairs(Some("reference=St+Mary%27s"));
        assert_eq!(pairs[0].1, "St Mary's");
    }

    #[test]
    fn missing_query_is_empty() {
        assert!(parse_query_pairs(None).is_empty());
    }
}
