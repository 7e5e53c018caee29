//! Policy-driven embedding of queries and product inputs.
//!
//! The embedder combines an embedding model with an image fetcher and
//! applies the configured source policy: URL-shaped inputs may be fetched
//! and embedded as images, with text as the literal or fallback path. All
//! vectors leaving this module are L2-normalized, which is the invariant
//! that makes inner-product search equivalent to cosine similarity.

use crate::fetch::ImageFetcher;
use crate::model::{l2_normalize, EmbeddingModel};
use lookalike_core::{AppResult, SourcePolicy};
use std::sync::Arc;
use tracing::warn;

/// Check whether an input string is URL-shaped (http:// or https://,
/// case-insensitive).
pub fn is_url(input: &str) -> bool {
    let trimmed = input.trim();
    let lower_prefix: String = trimmed.chars().take(8).collect::<String>().to_ascii_lowercase();
    lower_prefix.starts_with("http://") || lower_prefix.starts_with("https://")
}

/// Embeds queries and product inputs according to a source policy.
pub struct Embedder {
    model: Arc<dyn EmbeddingModel>,
    fetcher: ImageFetcher,
}

impl Embedder {
    /// Create an embedder around a model, with a default image fetcher.
    pub fn new(model: Arc<dyn EmbeddingModel>) -> AppResult<Self> {
        Ok(Self {
            model,
            fetcher: ImageFetcher::new()?,
        })
    }

    /// The embedding dimension of the underlying model.
    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// The underlying model's identifier.
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Embed literal text. Never performs a network fetch.
    pub async fn embed_text(&self, text: &str) -> AppResult<Vec<f32>> {
        let vector = self.model.encode_text(text).await?;
        Ok(l2_normalize(vector))
    }

    /// Fetch an image URL and embed its content. No fallback: any fetch or
    /// decode failure surfaces as an `Embed` error.
    pub async fn embed_image_url(&self, url: &str) -> AppResult<Vec<f32>> {
        let bytes = self.fetcher.fetch(url).await?;
        let vector = self.model.encode_image(&bytes).await?;
        Ok(l2_normalize(vector))
    }

    /// Embed an input string under the given source policy.
    ///
    /// - `Image`: the input must be a fetchable image URL.
    /// - `Text`: the input is embedded literally.
    /// - `Auto`: URL-shaped inputs try the image path first and fall back
    ///   to embedding the original string as text; other inputs are text.
    pub async fn embed(&self, input: &str, policy: SourcePolicy) -> AppResult<Vec<f32>> {
        match policy {
            SourcePolicy::Image => self.embed_image_url(input).await,
            SourcePolicy::Text => self.embed_text(input).await,
            SourcePolicy::Auto => {
                if is_url(input) {
                    match self.embed_image_url(input).await {
                        Ok(vector) => Ok(vector),
                        Err(e) => {
                            warn!("Image embedding failed for {}, falling back to text: {}", input, e);
                            self.embed_text(input).await
                        }
                    }
                } else {
                    self.embed_text(input).await
                }
            }
        }
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.model.model_name())
            .field("dimension", &self.model.dimension())
            .finish()
    }
}
