use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::domain::model::StageInfo;
use crate::utils::monitor::ProcessStats;
use crate::web::response::ErrorEnvelope;
use crate::web::state::SharedState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<ProcessStats>,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.config.is_mock_only() { "mock" } else { "scripts" },
        monitor: state.monitor.stats(),
    })
}

pub async fn stages(State(state): State<SharedState>) -> Json<Vec<StageInfo>> {
    Json(state.stages.stage_catalogue())
}

pub async fn not_found() -> (StatusCode, Json<ErrorEnvelope>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorEnvelope {
            status: "error",
            error: "Not found".to_string(),
            message: "Endpoint not found".to_string(),
        }),
    )
}
