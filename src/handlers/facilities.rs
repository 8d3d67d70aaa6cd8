use super::common::{
    created_response, map_service_error, success_response, PaginatedResponse, PaginationParams,
};
use crate::{
    entities::FacilityType,
    errors::ApiError,
    events::Event,
    handlers::AppState,
    models::{FacilityField, NewFacilityRequest},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldUpdatedResponse {
    pub facility_id: i64,
    pub field: FacilityField,
    pub previous_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCountyRequest {
    pub county: String,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountyUpdatedResponse {
    pub facility_id: i64,
    /// Prior location as `"County,ST"`.
    pub previous: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct InactiveReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacilityTypeRequest {
    pub facility_type: FacilityType,
}

#[derive(Debug, Deserialize)]
pub struct MaxSupplyLoadRequest {
    pub max_supply_load: String,
}

/// Flags settable through `PUT /facilities/:id/<flag>`.
#[derive(Debug, Clone, Copy)]
enum StatusFlag {
    Active,
    AcceptingDonations,
    DistributingSupplies,
    PubliclyVisible,
}

impl StatusFlag {
    fn name(self) -> &'static str {
        match self {
            StatusFlag::Active => "active",
            StatusFlag::AcceptingDonations => "accepting_donations",
            StatusFlag::DistributingSupplies => "distributing_supplies",
            StatusFlag::PubliclyVisible => "publicly_visible",
        }
    }
}

async fn create_facility(
    State(state): State<AppState>,
    Json(payload): Json<NewFacilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let facilities = &state.services.facilities;
    let facility_id = facilities
        .add_facility(payload)
        .await
        .map_err(map_service_error)?;
    state
        .event_sender
        .publish(Event::FacilityCreated(facility_id))
        .await;

    let facility = facilities.get(facility_id).await.map_err(map_service_error)?;
    info!(facility_id, "Facility created via API");
    Ok(created_response(facility))
}

async fn list_facilities(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page();
    let per_page = params.per_page_or(state.config.default_page_size);
    let (facilities, total) = state
        .services
        .facilities
        .list(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        facilities, page, per_page, total,
    )))
}

async fn get_facility(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state.services.facilities.get(id).await?;
    Ok(success_response(facility))
}

async fn get_facility_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.services.facilities.fetch_status(id).await?;
    Ok(success_response(status))
}

async fn update_field(
    State(state): State<AppState>,
    Path((id, field)): Path<(i64, String)>,
    Json(payload): Json<UpdateFieldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let field = FacilityField::from_str(&field)
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not an updatable field", field)))?;

    let previous_value = state
        .services
        .facilities
        .update_field(id, field, &payload.value)
        .await?;
    state
        .event_sender
        .publish(Event::FacilityUpdated {
            facility_id: id,
            field: field.to_string(),
        })
        .await;

    Ok(success_response(FieldUpdatedResponse {
        facility_id: id,
        field,
        previous_value,
    }))
}

async fn update_county(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCountyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let previous = state
        .services
        .facilities
        .update_county(id, &payload.county, &payload.state)
        .await?;
    state
        .event_sender
        .publish(Event::FacilityUpdated {
            facility_id: id,
            field: FacilityField::County.to_string(),
        })
        .await;

    Ok(success_response(CountyUpdatedResponse {
        facility_id: id,
        previous,
    }))
}

async fn set_flag(
    state: &AppState,
    id: i64,
    flag: StatusFlag,
    value: bool,
) -> Result<axum::response::Response, ApiError> {
    let facilities = &state.services.facilities;
    match flag {
        StatusFlag::Active => facilities.set_active(id, value).await?,
        StatusFlag::AcceptingDonations => facilities.set_accepting_donations(id, value).await?,
        StatusFlag::DistributingSupplies => {
            facilities.set_distributing_supplies(id, value).await?
        }
        StatusFlag::PubliclyVisible => facilities.set_publicly_visible(id, value).await?,
    }
    status_changed(state, id, flag.name()).await
}

/// Publishes the change and answers with the facility's current status.
async fn status_changed(
    state: &AppState,
    id: i64,
    field: &str,
) -> Result<axum::response::Response, ApiError> {
    state
        .event_sender
        .publish(Event::FacilityUpdated {
            facility_id: id,
            field: field.to_string(),
        })
        .await;
    let status = state.services.facilities.fetch_status(id).await?;
    Ok(success_response(status))
}

async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FlagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_flag(&state, id, StatusFlag::Active, payload.value).await
}

async fn set_accepting_donations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FlagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_flag(&state, id, StatusFlag::AcceptingDonations, payload.value).await
}

async fn set_distributing_supplies(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FlagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_flag(&state, id, StatusFlag::DistributingSupplies, payload.value).await
}

async fn set_publicly_visible(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FlagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_flag(&state, id, StatusFlag::PubliclyVisible, payload.value).await
}

async fn set_inactive_reason(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<InactiveReasonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .facilities
        .set_inactive_reason(id, payload.reason)
        .await?;
    status_changed(&state, id, "inactive_reason").await
}

async fn set_facility_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FacilityTypeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .facilities
        .set_facility_type(id, payload.facility_type)
        .await?;
    status_changed(&state, id, "facility_type").await
}

async fn set_max_supply_load(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MaxSupplyLoadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let facilities = &state.services.facilities;
    facilities
        .set_max_supply_load(id, &payload.max_supply_load)
        .await?;
    state
        .event_sender
        .publish(Event::FacilityUpdated {
            facility_id: id,
            field: "max_supply_load".to_string(),
        })
        .await;

    let facility = facilities.get(id).await?;
    Ok(success_response(facility))
}

async fn get_audit_trail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.services.facilities.audit_trail(id).await?;
    Ok(success_response(entries))
}

async fn get_facility_distances(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.facilities.get(id).await?;
    let entries = state.services.distances.list_for_facility(id).await?;
    Ok(success_response(entries))
}

/// Creates the router for facility endpoints
pub fn facilities_routes() -> Router<AppState> {
    Router::new()
        .route("/facilities", get(list_facilities).post(create_facility))
        .route("/facilities/:id", get(get_facility))
        .route("/facilities/:id/status", get(get_facility_status))
        .route("/facilities/:id/fields/:field", put(update_field))
        .route("/facilities/:id/county", put(update_county))
        .route("/facilities/:id/active", put(set_active))
        .route(
            "/facilities/:id/accepting-donations",
            put(set_accepting_donations),
        )
        .route(
            "/facilities/:id/distributing-supplies",
            put(set_distributing_supplies),
        )
        .route("/facilities/:id/publicly-visible", put(set_publicly_visible))
        .route("/facilities/:id/inactive-reason", put(set_inactive_reason))
        .route("/facilities/:id/facility-type", put(set_facility_type))
        .route("/facilities/:id/max-supply-load", put(set_max_supply_load))
        .route("/facilities/:id/audit", get(get_audit_trail))
        .route("/facilities/:id/distances", get(get_facility_distances))
}
