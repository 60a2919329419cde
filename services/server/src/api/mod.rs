//! HTTP API handlers and routing.

pub mod error;
mod health;
mod hospitals;
mod metrics;
mod pool;
pub mod request_context;

use axum::{
    http::{header, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Routes under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(hospitals::routes())
        .merge(pool::routes())
        .merge(metrics::routes())
}

/// Create the main router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    let mut router = Router::new()
        // Health endpoints
        .merge(health::routes())
        .nest("/api", api_routes());

    // Static front end for everything the API does not claim
    if let Some(dir) = state.frontend_dir() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(cors)
        // Application state
        .with_state(state)
}
