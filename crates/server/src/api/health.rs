//! Server liveness and effective configuration.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub profile: String,
    pub reconcile_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Connected notification subscribers.
    pub subscribers: usize,
    /// Effective configuration with secrets removed.
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        profile: state.config.profile_label().to_string(),
        reconcile_interval_secs: state.config.poller.reconcile_interval_secs,
        heartbeat_interval_secs: state.config.poller.heartbeat_interval_secs,
        subscribers: state.bus.subscriber_count(),
        config: state.config.redacted_summary(),
    })
}
