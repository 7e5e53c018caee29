//! Image fetching for embedding inputs.

use lookalike_core::{AppError, AppResult};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetch timeout in seconds. Image hosts that take longer than this are
/// treated as unreachable rather than allowed to stall a build or request.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Upper bound on accepted image payloads.
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Downloads images referenced by product records and queries.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Create a fetcher with a bounded request timeout.
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch an image URL and return its raw bytes.
    ///
    /// Fails with `AppError::Embed` when the URL is unreachable, the
    /// response is not a success, the payload exceeds the size bound, or
    /// the bytes do not carry a known image signature.
    pub async fn fetch(&self, url: &str) -> AppResult<Vec<u8>> {
        debug!("Fetching image {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Embed(format!("Failed to fetch image {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Embed(format!(
                "Image fetch for {} returned {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Embed(format!("Failed to read image body from {}: {}", url, e)))?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Embed(format!(
                "Image at {} exceeds {} byte limit",
                url, MAX_IMAGE_BYTES
            )));
        }

        if !sniff_image(&bytes) {
            return Err(AppError::Embed(format!(
                "Response from {} is not a recognized image format",
                url
            )));
        }

        Ok(bytes.to_vec())
    }
}

/// Check the leading bytes for a known image signature (JPEG, PNG, GIF,
/// WebP, BMP).
pub fn sniff_image(bytes: &[u8]) -> bool {
    if bytes.len() < 12 {
        return false;
    }

    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP")
        || bytes.starts_with(b"BM")
}
