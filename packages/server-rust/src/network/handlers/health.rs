//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose host health for orchestrators (Kubernetes, load
//! balancers) and operational monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HostHealth {
    pub state: &'static str,
    pub controller: String,
    pub owned_shards: usize,
    pub in_flight: u64,
    pub uptime_secs: u64,
}

/// Returns detailed health information as JSON.
///
/// Always 200. The `state` field tells a host that is up but draining apart
/// from one that is serving.
pub async fn health_handler(State(state): State<AppState>) -> Json<HostHealth> {
    let controller = state.service.controller();
    Json(HostHealth {
        state: state.shutdown.health_state().as_str(),
        controller: controller.status().describe(),
        owned_shards: controller.table().owned_count(),
        in_flight: state.shutdown.in_flight_count(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Kubernetes liveness probe. Shard state is not consulted.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe.
///
/// 503 until the startup barrier opens, while draining, and after stop.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state().is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
