//! Remote encoder service embedding model.
//!
//! Talks to an external encoder process (a CLIP-style service exposing text
//! and image endpoints) over HTTP. The embedding dimension is discovered by
//! probing the service at construction time.

use crate::model::EmbeddingModel;
use async_trait::async_trait;
use lookalike_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

const TEXT_ENDPOINT: &str = "/encode/text";
const IMAGE_ENDPOINT: &str = "/encode/image";

/// Maximum retry attempts for failed requests
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fixed probe input used to discover the model's output dimension.
const DIMENSION_PROBE: &str = "dimension probe";

/// Embedding model backed by a remote encoder service.
#[derive(Debug, Clone)]
pub struct RemoteModel {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl RemoteModel {
    /// Connect to the encoder service and discover the model dimension.
    ///
    /// Fails with `AppError::Embed` when the service is unreachable or the
    /// model cannot be loaded there.
    pub async fn connect(base_url: String, model: String) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embed(format!("Failed to create HTTP client: {}", e)))?;

        let mut remote = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension: 0,
        };

        let probe = remote.encode_text_with_retries(DIMENSION_PROBE).await.map_err(|e| {
            error!("Encoder probe failed: {}", e);
            AppError::Embed(format!(
                "Encoder service not available at {} for model '{}': {}",
                remote.base_url, remote.model, e
            ))
        })?;

        if probe.is_empty() {
            return Err(AppError::Embed(format!(
                "Encoder service at {} returned an empty embedding",
                remote.base_url
            )));
        }

        remote.dimension = probe.len();
        debug!(
            "Encoder ready: model '{}' at {} ({} dimensions)",
            remote.model, remote.base_url, remote.dimension
        );

        Ok(remote)
    }

    async fn encode_text_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        self.with_retries(|| self.encode_text_once(text)).await
    }

    async fn encode_image_with_retries(&self, bytes: &[u8]) -> AppResult<Vec<f32>> {
        self.with_retries(|| self.encode_image_once(bytes)).await
    }

    async fn with_retries<F, Fut>(&self, mut attempt_fn: F) -> AppResult<Vec<f32>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AppResult<Vec<f32>>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < MAX_RETRIES {
            match attempt_fn().await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                        warn!(
                            "Encoder request failed (attempt {}/{}), retrying in {}ms",
                            attempt, MAX_RETRIES, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Embed("Unknown encoder error".to_string())))
    }

    async fn encode_text_once(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, TEXT_ENDPOINT);
        let request = TextRequest {
            model: &self.model,
            text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embed(format!("Failed to reach encoder: {}", e)))?;

        self.parse_response(response).await
    }

    async fn encode_image_once(&self, bytes: &[u8]) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, IMAGE_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .query(&[("model", self.model.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Embed(format!("Failed to reach encoder: {}", e)))?;

        self.parse_response(response).await
    }

    async fn parse_response(&self, response: reqwest::Response) -> AppResult<Vec<f32>> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(AppError::Embed(format!(
                    "Encoder error ({}): {}",
                    status, err.error
                )));
            }

            return Err(AppError::Embed(format!(
                "Encoder error ({}): {}",
                status, error_text
            )));
        }

        let body: EncodeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embed(format!("Failed to parse encoder response: {}", e)))?;

        // The probe establishes the dimension; later drift means the service
        // swapped models underneath us.
        if self.dimension != 0 && body.embedding.len() != self.dimension {
            return Err(AppError::Embed(format!(
                "Encoder returned {} dimensions, expected {}",
                body.embedding.len(),
                self.dimension
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingModel for RemoteModel {
    fn provider_name(&self) -> &str {
        "remote"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_text(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embed("Cannot embed empty text".to_string()));
        }
        self.encode_text_with_retries(text).await
    }

    async fn encode_image(&self, bytes: &[u8]) -> AppResult<Vec<f32>> {
        if bytes.is_empty() {
            return Err(AppError::Embed("Cannot embed empty image".to_string()));
        }
        self.encode_image_with_retries(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_unreachable_endpoint() {
        // Nothing listens on this port; connect must fail rather than hang.
        let result = RemoteModel::connect(
            "http://127.0.0.1:1".to_string(),
            "clip-vit-b-32".to_string(),
        )
        .await;

        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("not available"), "unexpected error: {}", msg);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        // connect() trims before any request is issued; check the helper
        // logic through the struct directly.
        let remote = RemoteModel {
            client: Client::new(),
            base_url: "http://localhost:8501".to_string(),
            model: "clip-vit-b-32".to_string(),
            dimension: 512,
        };
        assert_eq!(remote.base_url, "http://localhost:8501");
        assert_eq!(remote.dimension(), 512);
    }
}
