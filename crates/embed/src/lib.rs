//! Embedding engine for the Lookalike service.
//!
//! Provides provider-agnostic embedding generation for product images and
//! text, plus the source-policy logic that decides how a given input is
//! embedded (image fetch vs. literal text).

pub mod embedder;
pub mod fetch;
pub mod model;
pub mod models;

// Re-export commonly used types
pub use embedder::{is_url, Embedder};
pub use fetch::ImageFetcher;
pub use model::{create_model, l2_normalize, EmbeddingModel};
