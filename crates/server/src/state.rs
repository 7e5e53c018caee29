//! Shared application state for request handlers.

use std::sync::Arc;

use lookalike_index::SearchIndex;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<SearchIndex>,
    pub default_top_k: usize,
    pub max_top_k: usize,
}
