//! Dose pool endpoints: status, allocation cycles, replenishment.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vaxishare_allocator::AllocationPolicy;

use crate::api::error::ApiError;
use crate::api::hospitals::{hospital_views, HospitalView};
use crate::api::request_context::RequestContext;
use crate::state::AppState;

/// Create pool routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/allocate", post(allocate))
        .route("/replenish", post(replenish))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub total_vaccines: u64,
    pub available_vaccines: u64,
    pub average_wait_time: f64,
    pub throughput: f64,
    pub has_starvation: bool,
}

/// Request to run one allocation cycle.
#[derive(Debug, Deserialize, Serialize)]
pub struct AllocateRequest {
    /// One of FCFS, PRIORITY, FAIR_SHARE, SJF (case-insensitive).
    pub algorithm: String,
}

#[derive(Debug, Serialize)]
pub struct AllocateResponse {
    pub success: bool,
    pub message: String,
    pub algorithm: AllocationPolicy,
    /// Doses handed out by the policy pass.
    pub allocated: u64,
    /// Doses handed out by starvation remediation.
    pub remediated: u64,
    pub hospitals: Vec<HospitalView>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReplenishRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishResponse {
    pub success: bool,
    pub total_vaccines: u64,
    pub available_vaccines: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/status
async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let scheduler = state.scheduler();
    let status = state.pool().status();

    Json(StatusResponse {
        total_vaccines: status.total,
        available_vaccines: status.available,
        average_wait_time: scheduler.average_wait_time(),
        throughput: scheduler.throughput(),
        has_starvation: status.starved > 0,
    })
}

/// Run one scheduler cycle with the named policy.
///
/// POST /api/allocate
async fn allocate(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<AllocateResponse>, ApiError> {
    let policy: AllocationPolicy = req
        .algorithm
        .parse()
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let report = state.scheduler().run_cycle(policy);
    let allocated = report.allocated.total();
    let remediated = report.remediated.total();

    info!(
        request_id = %ctx.request_id,
        policy = %policy,
        allocated,
        remediated,
        "Allocation requested"
    );

    let message = if report.starvation_detected {
        format!("Allocated {allocated} doses using {policy}; remediated {remediated} for starved hospitals")
    } else {
        format!("Allocated {allocated} doses using {policy}")
    };

    Ok(Json(AllocateResponse {
        success: true,
        message,
        algorithm: policy,
        allocated,
        remediated,
        hospitals: hospital_views(&state),
    }))
}

/// Add doses to the pool.
///
/// POST /api/replenish
async fn replenish(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<ReplenishRequest>,
) -> Result<Json<ReplenishResponse>, ApiError> {
    let pool = state.pool();
    pool.replenish(req.amount)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    info!(request_id = %ctx.request_id, amount = req.amount, "Pool replenished");

    let status = pool.status();
    Ok(Json(ReplenishResponse {
        success: true,
        total_vaccines: status.total,
        available_vaccines: status.available,
    }))
}
