use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    recorder_kind: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub recorder: &'static str,
    pub checked_at: String,
}

pub fn router(recorder_kind: &'static str) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { recorder_kind })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "promptbot-server",
        recorder: state.recorder_kind,
        checked_at: Utc::now().to_rfc3339(),
    })
}
