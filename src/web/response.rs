//! JSON error envelope shared by every endpoint.

use crate::utils::error::DashboardError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub error: String,
    pub message: String,
}

/// Handler error; renders as [`ErrorEnvelope`].
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl<E> From<E> for ApiError
where
    E: Into<DashboardError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            DashboardError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            DashboardError::NoStoresSelected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                self.0,
                self.0.category(),
                self.0.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", self.0.recovery_suggestion());
        } else {
            tracing::warn!("Request rejected with {}: {}", status, self.0);
        }

        let body = ErrorEnvelope {
            status: "error",
            error: self.0.to_string(),
            message: self.0.user_friendly_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(DashboardError::validation("bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(DashboardError::NoStoresSelected { threshold: 1.0 }).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError(DashboardError::NotImplemented {
                feature: "Map export".to_string()
            })
            .status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(ApiError::from(io).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
