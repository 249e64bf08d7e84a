//! Manual reconciliation trigger.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use hydrosync_reconcile::TriggerAck;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ForceCheckResponse {
    pub message: &'static str,
}

/// Request an immediate reconciliation pass.
///
/// Always acknowledged: the request goes through the same single-flight gate
/// as scheduled passes and is dropped if one is already running.
#[utoipa::path(
    post,
    path = "/force-check",
    tag = "Reconciliation",
    responses(
        (status = 200, description = "Trigger accepted", body = ForceCheckResponse)
    )
)]
pub async fn force_check(State(state): State<Arc<AppState>>) -> Json<ForceCheckResponse> {
    match state.trigger.request() {
        TriggerAck::Requested => info!("manual check requested"),
        TriggerAck::AlreadyPending => info!("manual check already pending"),
        TriggerAck::PollerStopped => warn!("manual check requested but poller is not running"),
    }
    Json(ForceCheckResponse {
        message: "Manual check triggered",
    })
}
