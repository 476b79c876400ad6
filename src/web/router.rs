//! Axum router — maps all URL paths to handlers.

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::web::handlers::{
    export::{export_bundle, export_map, export_predictions, export_routes},
    pipeline::{predict, preprocess, route, train},
    system::{health, not_found, stages},
};
use crate::web::state::{AppState, SharedState};

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.server.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let static_dir = state.config.server.static_dir.clone();
    let shared: SharedState = Arc::new(state);

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/stages", get(stages))
        // Stages
        .route("/api/preprocess", post(preprocess))
        .route("/api/train", post(train))
        .route("/api/predict", post(predict))
        .route("/api/route", post(route))
        // Exports
        .route("/api/export/predictions", get(export_predictions))
        .route("/api/export/routes", get(export_routes))
        .route("/api/export/bundle", get(export_bundle))
        .route("/api/export/map", get(export_map));

    // Compiled dashboard UI, when configured.
    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.fallback(not_found),
    };

    app.layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
