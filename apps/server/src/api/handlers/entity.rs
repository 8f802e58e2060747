//! Single entity lookup

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::state::AppState;
use crate::{Error, Result};
use terrier_model::Entity;

/// GET /entity/{entity}
pub async fn get_entity(
    State(state): State<AppState>,
    Path(entity): Path<i64>,
) -> Result<Json<Entity>> {
    match state.engine.get(entity).await? {
        Some(found) => Ok(Json(found)),
        None => Err(Error::EntityNotFound(entity)),
    }
}
