//! Scheduler metrics endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;
use vaxishare_allocator::SchedulerMetrics;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/metrics/reset", post(reset_metrics))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub average_wait_time: f64,
    pub throughput: f64,
    pub total_wait_time: f64,
    pub total_requests: u64,
    pub pending_requests: usize,
}

impl From<SchedulerMetrics> for MetricsResponse {
    fn from(m: SchedulerMetrics) -> Self {
        Self {
            average_wait_time: m.average_wait_time,
            throughput: m.throughput,
            total_wait_time: m.total_wait_accrued,
            total_requests: m.total_requests_served,
            pending_requests: m.pending,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetMetricsResponse {
    pub success: bool,
    pub average_wait_time: f64,
    pub throughput: f64,
}

/// GET /api/metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.scheduler().metrics().into())
}

/// Zero the accumulated counters. Pending requests are kept.
///
/// POST /api/metrics/reset
async fn reset_metrics(State(state): State<AppState>) -> Json<ResetMetricsResponse> {
    let scheduler = state.scheduler();
    scheduler.reset_metrics();
    info!("Scheduler metrics reset");

    Json(ResetMetricsResponse {
        success: true,
        average_wait_time: scheduler.average_wait_time(),
        throughput: scheduler.throughput(),
    })
}
