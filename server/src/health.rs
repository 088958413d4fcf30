//! Health and readiness endpoints.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Liveness check. Returns 200 without touching any dependency.
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status.
    pub ready: bool,
    /// Document store reachability.
    pub store: bool,
}

/// Readiness check. Probes the document store with a cheap read and
/// reports 503 while it is unreachable.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store = state.store.list_all().await.is_ok();
    let status = if store {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready: store,
            store,
        }),
    )
}
