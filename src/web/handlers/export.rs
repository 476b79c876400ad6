//! CSV / ZIP downloads and the map export placeholder.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::core::export;
use crate::utils::error::DashboardError;
use crate::web::response::ApiError;
use crate::web::state::SharedState;

fn attachment(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn export_predictions(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let bytes = export::predictions_csv(&state.config).await?;
    Ok(attachment("text/csv; charset=utf-8", export::PREDICTIONS_FILENAME, bytes))
}

pub async fn export_routes(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let bytes = export::routes_csv(&state.config).await?;
    Ok(attachment("text/csv; charset=utf-8", export::ROUTES_FILENAME, bytes))
}

pub async fn export_bundle(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let bytes = export::bundle_zip(&state.config).await?;
    Ok(attachment("application/zip", "demand_route_export.zip", bytes))
}

pub async fn export_map() -> ApiError {
    ApiError(DashboardError::NotImplemented {
        feature: "Map export".to_string(),
    })
}
