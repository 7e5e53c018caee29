//! HTTP routing and error mapping.

pub mod health;
pub mod products;
pub mod search;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lookalike_core::AppError;
use serde_json::json;

use crate::state::AppState;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search::search))
        .route("/add-product/{product_id}", post(products::add_product))
        .route("/delete-product/{product_id}", post(products::delete_product))
        .route("/health", get(health::health))
        .with_state(state)
}

/// Error surface of the HTTP layer.
///
/// A non-ready index maps to 503 so clients treat it as retryable; it is
/// never reported as success with partial data.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::App(err) => (app_error_status(&err), err.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn app_error_status(err: &AppError) -> StatusCode {
    match err {
        AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::AlreadyDeleted(_) => StatusCode::GONE,
        AppError::Embed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Source(_) | AppError::Config(_) => StatusCode::BAD_GATEWAY,
        AppError::Dimension { .. }
        | AppError::Persistence(_)
        | AppError::Io(_)
        | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
