//! Similarity search endpoint.

use axum::extract::State;
use axum::Json;
use lookalike_index::SearchHit;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Image URL or free text
    #[serde(default)]
    pub query: Option<String>,

    /// Number of results to return
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub count: usize,
}

/// `POST /search`: rank products by similarity to the query.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = request.query.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query is required".to_string()));
    }

    let top_k = clamp_top_k(request.top_k, state.default_top_k, state.max_top_k);

    let results = state.index.search(query, top_k).await?;
    let count = results.len();

    Ok(Json(SearchResponse { results, count }))
}

/// Apply the default and the per-request ceiling. A zero `top_k` is
/// treated as unspecified.
fn clamp_top_k(requested: Option<usize>, default_top_k: usize, max_top_k: usize) -> usize {
    match requested {
        Some(0) | None => default_top_k,
        Some(k) => k.min(max_top_k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_top_k() {
        assert_eq!(clamp_top_k(None, 5, 50), 5);
        assert_eq!(clamp_top_k(Some(0), 5, 50), 5);
        assert_eq!(clamp_top_k(Some(12), 5, 50), 12);
        assert_eq!(clamp_top_k(Some(500), 5, 50), 50);
    }

    #[test]
    fn test_search_request_parses_partial_body() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "red bag"}"#).unwrap();
        assert_eq!(request.query.as_deref(), Some("red bag"));
        assert!(request.top_k.is_none());

        let request: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.query.is_none());
    }
}
