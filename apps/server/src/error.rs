//! Error types for the search service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Remote search backend error: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("Remote search backend returned HTTP {status}")]
    RemoteStatus { status: u16 },

    #[error("Unsupported geometry relation: {relation}")]
    UnsupportedRelation { relation: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(i64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Error::EntityNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::UnsupportedRelation { .. } | Error::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // Backend failures are fatal for the request and never retried
            // here; the caller sees a gateway error with no partial results.
            Error::Database(_) | Error::Remote(_) | Error::RemoteStatus { .. } => {
                tracing::error!("Search backend failure: {}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "Search backend unavailable".to_string(),
                )
            }
            Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "error": error_message,
        }));

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        response
    }
}
