//! Readiness and progress endpoint.

use axum::extract::State;
use axum::Json;
use lookalike_index::HealthReport;

use crate::state::AppState;

/// `GET /health`: always 200; readiness, size, build progress, and the
/// last error live in the body. Clients poll this while the initial build
/// (potentially model-download bound) runs.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.index.health().await)
}
