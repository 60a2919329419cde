//! Hospital API endpoints.
//!
//! Hospitals are the consumers of the shared dose pool: they register once
//! and then submit requests that the next allocation cycle serves.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vaxishare_allocator::{ConsumerId, ConsumerRecord, ConsumerSpec};

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::state::AppState;

/// Create hospital routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hospitals", get(list_hospitals))
        .route("/hospital", post(register_hospital))
        .route("/request", post(submit_request))
        .route("/hospitals/{hospital_id}/reset-wait", post(reset_wait))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to register a new hospital.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHospitalRequest {
    pub id: ConsumerId,
    pub name: String,
    /// Larger values are served first under PRIORITY.
    pub priority: i64,
    pub high_risk_population: u64,
}

/// Request for doses on behalf of a registered hospital.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub hospital_id: ConsumerId,
    /// Negative amounts are treated as zero.
    pub amount: i64,
}

/// Snapshot of a single hospital.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalView {
    pub id: ConsumerId,
    pub name: String,
    pub priority: i64,
    pub current_vaccines: u64,
    pub requested_vaccines: u64,
    pub high_risk_population: u64,
    pub wait_time: f64,
    pub need: f64,
    pub is_starved: bool,
}

impl From<&ConsumerRecord> for HospitalView {
    fn from(record: &ConsumerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            priority: record.priority,
            current_vaccines: record.granted,
            requested_vaccines: record.requested,
            high_risk_population: record.risk_weight,
            wait_time: record.wait_time,
            need: record.need(),
            is_starved: record.is_starved(),
        }
    }
}

/// Response for listing hospitals.
#[derive(Debug, Serialize)]
pub struct ListHospitalsResponse {
    pub hospitals: Vec<HospitalView>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

pub(crate) fn hospital_views(state: &AppState) -> Vec<HospitalView> {
    state
        .pool()
        .list_consumers()
        .iter()
        .map(HospitalView::from)
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// List every registered hospital in registration order.
///
/// GET /api/hospitals
async fn list_hospitals(State(state): State<AppState>) -> Json<ListHospitalsResponse> {
    Json(ListHospitalsResponse {
        hospitals: hospital_views(&state),
    })
}

/// Register a hospital.
///
/// POST /api/hospital
async fn register_hospital(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<RegisterHospitalRequest>,
) -> Result<Response, ApiError> {
    let id = req.id;
    let spec = ConsumerSpec::new(id, req.name, req.priority, req.high_risk_population);
    state
        .pool()
        .register(spec)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    info!(hospital_id = %id, request_id = %ctx.request_id, "Hospital registered");

    let ack = AckResponse {
        success: true,
        message: format!("Hospital {id} registered"),
    };
    Ok((StatusCode::CREATED, Json(ack)).into_response())
}

/// Record a hospital's outstanding request.
///
/// POST /api/request
async fn submit_request(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = req.hospital_id;
    state
        .scheduler()
        .add_request(id, req.amount)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id))?;

    let amount = req.amount.max(0);
    Ok(Json(AckResponse {
        success: true,
        message: format!("Request for {amount} doses recorded for hospital {id}"),
    }))
}

/// Restart a hospital's wait clock, clearing its starved status.
///
/// POST /api/hospitals/{hospital_id}/reset-wait
async fn reset_wait(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(hospital_id): Path<i64>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = ConsumerId::new(hospital_id);
    state
        .pool()
        .reset_wait(id)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    info!(hospital_id = %id, request_id = %ctx.request_id, "Wait time reset");

    Ok(Json(AckResponse {
        success: true,
        message: format!("Wait time reset for hospital {id}"),
    }))
}
