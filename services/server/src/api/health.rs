//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use vaxishare_allocator::PoolStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// RFC 3339.
    pub timestamp: String,
    pub allocator: AllocatorSummary,
}

/// Pool counters surfaced for operators; never gates the status.
#[derive(Debug, Serialize)]
pub struct AllocatorSummary {
    pub hospitals: usize,
    pub total: u64,
    pub available: u64,
    pub starved: usize,
}

impl From<PoolStatus> for AllocatorSummary {
    fn from(status: PoolStatus) -> Self {
        Self {
            hospitals: status.consumers,
            total: status.total,
            available: status.available,
            starved: status.starved,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
}

/// GET /healthz
async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "vaxishare-server",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        allocator: state.pool().status().into(),
    })
}

/// GET /livez, empty 200.
async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vaxishare_allocator::{ConsumerId, ConsumerSpec, RequestScheduler, ResourcePool};

    use super::*;

    #[tokio::test]
    async fn test_healthz_reports_pool_counters() {
        let pool = Arc::new(ResourcePool::new(75));
        pool.register(ConsumerSpec::new(ConsumerId::new(1), "Rural Clinic", 1, 1000))
            .unwrap();
        let state = AppState::new(Arc::new(RequestScheduler::new(pool)));

        let Json(body) = healthz(State(state)).await;

        assert_eq!(body.status, "ok");
        assert_eq!(body.allocator.hospitals, 1);
        assert_eq!(body.allocator.total, 75);
        assert_eq!(body.allocator.available, 75);
        assert_eq!(body.allocator.starved, 0);
    }

    #[tokio::test]
    async fn test_livez_returns_ok() {
        let response = livez().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
