//! Dataset entity counts

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::search::DatasetCount;
use crate::state::AppState;
use crate::Result;

/// GET /dataset/{dataset}/count
///
/// A dataset with no entities reports a zero count rather than a 404; the
/// dataset registry itself lives outside this service.
pub async fn get_dataset_count(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> Result<Json<DatasetCount>> {
    let counts = state.engine.dataset_counts(Some(&dataset)).await?;
    Ok(Json(counts.into_iter().next().unwrap_or(DatasetCount {
        dataset,
        count: 0,
    })))
}
