//! Hashing embedding model for local, offline operation.

use crate::model::{l2_normalize, EmbeddingModel};
use lookalike_core::AppResult;

/// Deterministic content-hashing embedding model.
///
/// Produces consistent, content-dependent vectors from text tokens or raw
/// image bytes without any network access. Not semantically meaningful like
/// a neural encoder, but identical inputs always map to identical vectors,
/// which is what development and the test suite need.
#[derive(Debug)]
pub struct HashModel {
    model: String,
    dimension: usize,
}

impl HashModel {
    /// Create a new hash model with the given dimension.
    pub fn new(model: String, dimension: usize) -> Self {
        Self { model, dimension }
    }

    fn text_vector(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for token in lower.split_whitespace() {
            // Whole-token hash
            let token_hash = fold_hash(token.as_bytes(), 31);
            acc[(token_hash as usize) % self.dimension] += 1.0;

            // Character trigrams spread each token over several dimensions
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let mut buf = [0u8; 12];
                let mut len = 0;
                for ch in window {
                    len += ch.encode_utf8(&mut buf[len..]).len();
                }
                let trigram_hash = fold_hash(&buf[..len], 37);
                acc[(trigram_hash as usize) % self.dimension] += 0.5;
            }
        }

        l2_normalize(acc)
    }

    fn image_vector(&self, bytes: &[u8]) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.dimension];

        // Byte windows capture local structure; the length bucket separates
        // files that happen to share a prefix.
        for window in bytes.chunks(8) {
            let window_hash = fold_hash(window, 131);
            acc[(window_hash as usize) % self.dimension] += 1.0;
        }
        let len_hash = fold_hash(&(bytes.len() as u64).to_le_bytes(), 257);
        acc[(len_hash as usize) % self.dimension] += 1.0;

        l2_normalize(acc)
    }
}

fn fold_hash(bytes: &[u8], mult: u64) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, b| acc.wrapping_mul(mult).wrapping_add(*b as u64))
}

#[async_trait::async_trait]
impl EmbeddingModel for HashModel {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_text(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.text_vector(text))
    }

    async fn encode_image(&self, bytes: &[u8]) -> AppResult<Vec<f32>> {
        Ok(self.image_vector(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> HashModel {
        HashModel::new("hash-v1".to_string(), 128)
    }

    #[tokio::test]
    async fn test_dimension_and_names() {
        let m = model();
        assert_eq!(m.dimension(), 128);
        assert_eq!(m.provider_name(), "hash");
        assert_eq!(m.model_name(), "hash-v1");
    }

    #[tokio::test]
    async fn test_text_embedding_normalized() {
        let m = model();
        let v = m.encode_text("red leather handbag").await.unwrap();
        assert_eq!(v.len(), 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_text_embedding_deterministic() {
        let m = model();
        let a = m.encode_text("blue denim jacket").await.unwrap();
        let b = m.encode_text("blue denim jacket").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let m = model();
        let a = m.encode_text("blue denim jacket").await.unwrap();
        let b = m.encode_text("green wool scarf").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_image_embedding_normalized_and_deterministic() {
        let m = model();
        let bytes = vec![0x89, 0x50, 0x4e, 0x47, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let a = m.encode_image(&bytes).await.unwrap();
        let b = m.encode_image(&bytes).await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let m = model();
        let v = m.encode_text("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
