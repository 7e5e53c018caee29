//! Full-index build pipeline.
//!
//! Produces a complete, consistent (vector store, id mapping) pair from a
//! product source. Per-record embedding failures are skips, not aborts:
//! one dead image URL must not take down the whole build.

use lookalike_core::{AppError, AppResult, SourcePolicy};
use lookalike_embed::Embedder;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::mapping::IdMapping;
use crate::product::ProductRecord;
use crate::source::SourceRouter;
use crate::status::{IndexPhase, IndexStatus};
use crate::store::VectorStore;

/// Embed a product record under the configured source policy.
///
/// With `Auto` or `Image`, each image URL is tried in order and the first
/// one that fetches and encodes wins. `Auto` (and `Text`) fall back to the
/// name-plus-description text; under `Image` a product with no usable
/// image is an `Embed` error.
pub async fn embed_product(
    embedder: &Embedder,
    record: &ProductRecord,
    policy: SourcePolicy,
) -> AppResult<Vec<f32>> {
    if policy != SourcePolicy::Text {
        for url in &record.image_urls {
            match embedder.embed_image_url(url).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    debug!("Image {} for product {} unusable: {}", url, record.id, e);
                }
            }
        }

        if policy == SourcePolicy::Image {
            return Err(AppError::Embed(format!(
                "No fetchable image for product {}",
                record.id
            )));
        }
    }

    embedder.embed_text(&record.embedding_text()).await
}

/// Run a full build: enumerate candidates, embed each eligible record, and
/// return the populated pair together with the source label.
///
/// Progress is written through `status`: `total` is fixed once the source
/// is enumerated, `processed` increments for every record examined whether
/// it was indexed or skipped.
pub async fn run_build(
    embedder: &Embedder,
    router: &SourceRouter,
    policy: SourcePolicy,
    status: &RwLock<IndexStatus>,
) -> AppResult<(VectorStore, IdMapping)> {
    let (source_label, candidates) = router.fetch_all().await?;

    {
        let mut guard = status.write().await;
        guard.phase = IndexPhase::Building;
        guard.total = candidates.len() as u64;
        guard.processed = 0;
    }

    info!(
        "Building index from {}: {} candidate records",
        source_label,
        candidates.len()
    );

    let mut store = VectorStore::new(embedder.dimension());
    let mut mapping = IdMapping::new();
    let mut skipped = 0usize;

    for record in candidates {
        if record.is_deleted {
            debug!("Skipping deleted product {}", record.id);
            skipped += 1;
            status.write().await.processed += 1;
            continue;
        }

        match embed_product(embedder, &record, policy).await {
            Ok(vector) => {
                store.append(&vector)?;
                mapping.append(record)?;
            }
            Err(e) => {
                warn!("Skipping product {}: {}", record.id, e);
                skipped += 1;
            }
        }

        status.write().await.processed += 1;
    }

    info!(
        "Build complete: {} vectors indexed, {} records skipped",
        store.len(),
        skipped
    );

    Ok((store, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookalike_embed::models::hash::HashModel;
    use std::sync::Arc;

    fn embedder() -> Embedder {
        Embedder::new(Arc::new(HashModel::new("hash-v1".to_string(), 32))).unwrap()
    }

    fn record(id: u64, name: &str, image_urls: Vec<String>) -> ProductRecord {
        ProductRecord {
            id,
            name: name.to_string(),
            description: "test".to_string(),
            image_urls,
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_embed_product_text_policy() {
        let e = embedder();
        let r = record(1, "Red Handbag", vec!["http://127.0.0.1:1/a.jpg".to_string()]);

        // Text policy ignores the image URL entirely
        let vector = embed_product(&e, &r, SourcePolicy::Text).await.unwrap();
        let direct = e.embed_text(&r.embedding_text()).await.unwrap();
        assert_eq!(vector, direct);
    }

    #[tokio::test]
    async fn test_embed_product_auto_falls_back_to_text() {
        let e = embedder();
        let r = record(1, "Red Handbag", vec!["http://127.0.0.1:1/a.jpg".to_string()]);

        let vector = embed_product(&e, &r, SourcePolicy::Auto).await.unwrap();
        let as_text = e.embed_text(&r.embedding_text()).await.unwrap();
        assert_eq!(vector, as_text);
    }

    #[tokio::test]
    async fn test_embed_product_image_policy_fails_without_image() {
        let e = embedder();
        let r = record(1, "Red Handbag", vec![]);

        let result = embed_product(&e, &r, SourcePolicy::Image).await;
        assert!(matches!(result, Err(AppError::Embed(_))));
    }
}
