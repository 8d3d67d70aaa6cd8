use super::common::success_response;
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CountiesQuery {
    /// Comma separated state codes, e.g. `NC,VA`.
    pub states: Option<String>,
}

async fn list_max_supply_loads(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let options = state.services.references.list_max_supply_options().await?;
    Ok(success_response(options))
}

async fn list_counties(
    State(state): State<AppState>,
    Query(query): Query<CountiesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let states: Vec<String> = match query.states.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![state.config.default_state.clone()],
    };
    let counties = state.services.references.list_counties_by_state(&states).await?;
    Ok(success_response(counties))
}

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/reference/max-supply-loads", get(list_max_supply_loads))
        .route("/reference/counties", get(list_counties))
}
