//! Embedding model trait and factory.

use lookalike_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Dimension used by the hash model when none is configured. Matches the
/// output width of the default remote encoder model.
const DEFAULT_HASH_DIMENSION: usize = 512;

/// Trait for embedding models.
///
/// A model encodes either raw image bytes or literal text into a
/// fixed-dimension float vector. The dimension is a property of the loaded
/// model and is discovered at construction time, never hardcoded by callers.
#[async_trait::async_trait]
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "remote", "hash")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Encode literal text into an embedding vector.
    async fn encode_text(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Encode raw image bytes into an embedding vector.
    async fn encode_image(&self, bytes: &[u8]) -> AppResult<Vec<f32>>;
}

/// Create an embedding model based on configuration.
///
/// The "remote" provider probes its encoder service during construction and
/// fails fast when it is unreachable; the "hash" provider is local and
/// always available.
pub async fn create_model(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingModel>> {
    match config.embed_provider.as_str() {
        "hash" => {
            let model = super::models::hash::HashModel::new(
                config.embed_model.clone(),
                DEFAULT_HASH_DIMENSION,
            );
            Ok(Arc::new(model))
        }

        "remote" => {
            let model = super::models::remote::RemoteModel::connect(
                config.embed_endpoint.clone(),
                config.embed_model.clone(),
            )
            .await?;
            Ok(Arc::new(model))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: remote, hash",
            other
        ))),
    }
}

/// L2-normalize a vector so inner product equals cosine similarity.
///
/// The epsilon guard keeps the all-zero vector at zero instead of NaN.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + 1e-12;
    for x in &mut v {
        *x /= denom;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_length() {
        let v = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((v[0] - 0.6).abs() < 1e-5);
        assert!((v[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(vec![0.0, 0.0, 0.0]);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_create_hash_model() {
        let mut config = AppConfig::default();
        config.embed_provider = "hash".to_string();

        let model = create_model(&config).await.unwrap();
        assert_eq!(model.provider_name(), "hash");
        assert_eq!(model.dimension(), 512);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let mut config = AppConfig::default();
        config.embed_provider = "cloud".to_string();

        let result = create_model(&config).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }
}
