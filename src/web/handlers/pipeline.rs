//! Stage endpoints: preprocess, train, predict, route.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::domain::model::{
    PredictionRequest, PredictionResult, PreprocessReport, RouteRequest, RouteSummary,
    TrainingReport,
};
use crate::utils::error::DashboardError;
use crate::web::response::ApiError;
use crate::web::state::SharedState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError(DashboardError::validation(rejection.body_text())))
}

pub async fn preprocess(State(state): State<SharedState>) -> Result<Json<PreprocessReport>, ApiError> {
    Ok(Json(state.stages.preprocess().await?))
}

pub async fn train(State(state): State<SharedState>) -> Result<Json<TrainingReport>, ApiError> {
    Ok(Json(state.stages.train().await?))
}

pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let request = body(payload)?;
    tracing::debug!("Prediction request: {:?}", request);
    Ok(Json(state.stages.predict(&request).await?))
}

pub async fn route(
    State(state): State<SharedState>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteSummary>, ApiError> {
    let request = body(payload)?;
    tracing::debug!("Route request: {:?}", request);
    Ok(Json(state.stages.route(&request).await?))
}
