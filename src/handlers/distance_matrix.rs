use super::common::success_response;
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

const DEFAULT_PENDING_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RecordDistanceRequest {
    pub distance_miles: f64,
    pub drive_time_seconds: i64,
}

/// Pairs awaiting computation, for the distance worker.
async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT).max(1);
    let entries = state.services.distances.list_pending(limit).await?;
    Ok(success_response(entries))
}

async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.services.distances.count_by_status().await?;
    Ok(success_response(summary))
}

async fn get_entry(
    State(state): State<AppState>,
    Path((a, b)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .distances
        .get_entry(a, b)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No distance entry for {} and {}", a, b)))?;
    Ok(success_response(entry))
}

async fn record_computed(
    State(state): State<AppState>,
    Path((a, b)): Path<(i64, i64)>,
    Json(payload): Json<RecordDistanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .distances
        .record_computed(a, b, payload.distance_miles, payload.drive_time_seconds)
        .await?;
    Ok(success_response(entry))
}

pub fn distance_matrix_routes() -> Router<AppState> {
    Router::new()
        .route("/distance-matrix/pending", get(list_pending))
        .route("/distance-matrix/summary", get(summary))
        .route("/distance-matrix/:a/:b", get(get_entry).put(record_computed))
}
