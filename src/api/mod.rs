pub mod market;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::auth::require_api_key;
use crate::errors::{AppError, ErrorResponse};
use crate::AppState;

pub const SERVER_ID: &str = concat!("OTE API Module (OAM), v", env!("CARGO_PKG_VERSION"));

/// Assemble the API router. Everything except `GET /` requires an API key.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/marketData", get(market::market_data))
        .route("/coverage", get(market::coverage))
        .route("/dateDiff", get(market::date_diff))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), require_api_key));

    Router::new()
        .route("/", get(server_id))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn server_id() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "msg": SERVER_ID }))
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey { .. } => StatusCode::CONFLICT,
            AppError::Transport(_) | AppError::Parse(_) | AppError::ExhaustedRetries { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Database(_)
            | AppError::InvalidConfig(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
