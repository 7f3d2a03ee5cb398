//! Host introspection endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use history_router_core::messages::DescribeHistoryHostRequest;

use super::AppState;

/// Returns the host's shard ownership, controller status and cache sizes.
///
/// Answers 503 before the startup barrier opens instead of waiting for it,
/// so a probe never hangs on a host that is still acquiring shards.
pub async fn describe_host_handler(State(state): State<AppState>) -> Response {
    if !state.service.barrier().is_open() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let described = state
        .service
        .handler()
        .describe_history_host(DescribeHistoryHostRequest::default())
        .await;
    Json(described).into_response()
}
