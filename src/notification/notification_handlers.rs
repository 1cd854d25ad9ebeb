use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub triggered: bool,
}

/// Run the daily digest immediately
#[utoipa::path(
    post,
    path = "/api/notifications/digest/trigger",
    responses(
        (status = 200, description = "Dispatch finished; `triggered` is false when the run aborted", body = TriggerResponse)
    ),
    tag = "notifications"
)]
pub async fn trigger_digest(State(state): State<AppState>) -> Json<TriggerResponse> {
    let triggered = state.dispatcher.run_once().await;
    Json(TriggerResponse { triggered })
}
