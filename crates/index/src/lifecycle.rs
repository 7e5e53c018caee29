//! Index lifecycle and mutation management.
//!
//! `SearchIndex` is the single shared handle per process. It owns the
//! readiness state machine, runs the initial load-or-build in the
//! background, and serializes structural mutations (add, delete, rebuild)
//! against each other while searches proceed concurrently.
//!
//! Locking discipline: the (vector store, id mapping) pair lives inside one
//! `IndexInner` behind one `RwLock`, so no reader can ever observe the two
//! structures with disagreeing row spaces. The `mutation` mutex is the
//! single critical section for structural changes; the write lock is held
//! only for an in-memory append or a pointer swap, never across network or
//! disk I/O.

use std::sync::Arc;

use lookalike_core::{AppError, AppResult, SourcePolicy};
use lookalike_embed::Embedder;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::build;
use crate::mapping::IdMapping;
use crate::persist::{self, PersistPaths};
use crate::product::ProductRecord;
use crate::source::SourceRouter;
use crate::status::{HealthReport, IndexPhase, IndexStatus, Progress};
use crate::store::VectorStore;

/// A search result: the product snapshot annotated with its similarity to
/// the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub similarity: f32,
}

/// The paired index structures. Created together, mutated together,
/// replaced together.
#[derive(Debug)]
struct IndexInner {
    store: VectorStore,
    mapping: IdMapping,
}

impl IndexInner {
    /// Append a (vector, snapshot) pair, returning the shared row index.
    ///
    /// All checks happen before either structure is touched, so a failure
    /// leaves the pair consistent.
    fn append_pair(&mut self, vector: &[f32], product: ProductRecord) -> AppResult<usize> {
        if vector.len() != self.store.dimension() {
            return Err(AppError::Dimension {
                expected: self.store.dimension(),
                actual: vector.len(),
            });
        }
        if self.mapping.contains(product.id) {
            return Err(AppError::Source(format!(
                "product {} is already mapped",
                product.id
            )));
        }

        let row = self.store.append(vector)?;
        self.mapping.append(product)?;
        Ok(row)
    }

    /// Build a new pair without one product, reusing the stored vectors.
    ///
    /// This is the delete-rebuild protocol: O(N) in the number of rows, the
    /// documented cost of removal on an append-only vector structure. No
    /// re-embedding happens, only row membership changes.
    fn without(&self, product_id: u64) -> AppResult<IndexInner> {
        let target = self
            .mapping
            .row_of(product_id)
            .ok_or(AppError::NotFound(product_id))?;

        let mut vectors = Vec::with_capacity(self.store.len().saturating_sub(1));
        let mut entries = Vec::with_capacity(self.store.len().saturating_sub(1));

        for row in 0..self.store.len() {
            if row == target {
                continue;
            }
            if let (Some(vector), Some(entry)) = (self.store.row(row), self.mapping.get(row)) {
                vectors.push(vector.to_vec());
                entries.push(entry.clone());
            }
        }

        let mut store = VectorStore::new(self.store.dimension());
        store.rebuild_from(vectors)?;
        let mapping = IdMapping::from_entries(entries)?;

        Ok(IndexInner { store, mapping })
    }
}

/// Shared lifecycle manager for the product similarity index.
pub struct SearchIndex {
    embedder: Embedder,
    router: SourceRouter,
    policy: SourcePolicy,
    paths: PersistPaths,
    status: RwLock<IndexStatus>,
    inner: RwLock<Option<IndexInner>>,
    mutation: Mutex<()>,
}

fn not_loaded() -> AppError {
    AppError::NotReady("index structures are not loaded".to_string())
}

impl SearchIndex {
    /// Create the index handle. Nothing is loaded or built until
    /// [`SearchIndex::start`] is called.
    pub fn new(
        embedder: Embedder,
        router: SourceRouter,
        policy: SourcePolicy,
        paths: PersistPaths,
    ) -> Arc<Self> {
        Arc::new(Self {
            embedder,
            router,
            policy,
            paths,
            status: RwLock::new(IndexStatus::new()),
            inner: RwLock::new(None),
            mutation: Mutex::new(()),
        })
    }

    /// Launch the initial load-or-build on a background task.
    ///
    /// Requests issued while it runs are answered with `NotReady` rather
    /// than blocked. The returned handle resolves when the index reaches
    /// `Ready` or `Failed`.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let index = Arc::clone(self);
        tokio::spawn(async move {
            index.initialize().await;
        })
    }

    async fn initialize(&self) {
        match persist::load(&self.paths, self.embedder.dimension()) {
            Ok(Some((store, mapping))) => {
                let size = store.len() as u64;
                *self.inner.write().await = Some(IndexInner { store, mapping });

                let mut status = self.status.write().await;
                status.phase = IndexPhase::Ready;
                status.total = size;
                status.processed = size;

                info!("Loaded persisted index ({} products)", size);
                return;
            }
            Ok(None) => {
                info!("No persisted index found, building from source");
            }
            Err(e) => {
                warn!("Persisted index unusable ({}), rebuilding from source", e);
            }
        }

        self.build_and_install().await;
    }

    async fn build_and_install(&self) {
        {
            let mut status = self.status.write().await;
            status.phase = IndexPhase::Building;
            status.error = None;
        }

        match build::run_build(&self.embedder, &self.router, self.policy, &self.status).await {
            Ok((store, mapping)) => {
                // Persist before exposing: an index that cannot reach disk
                // is reported failed, not silently memory-only.
                if let Err(e) =
                    persist::save(&store, &mapping, self.embedder.model_name(), &self.paths)
                {
                    error!("Failed to persist freshly built index: {}", e);
                    let mut status = self.status.write().await;
                    status.phase = IndexPhase::Failed;
                    status.error = Some(e.to_string());
                    return;
                }

                let size = store.len();
                *self.inner.write().await = Some(IndexInner { store, mapping });
                self.status.write().await.phase = IndexPhase::Ready;
                info!("Index ready ({} products)", size);
            }
            Err(e) => {
                error!("Index build failed: {}", e);
                let mut status = self.status.write().await;
                status.phase = IndexPhase::Failed;
                status.error = Some(e.to_string());
            }
        }
    }

    /// Gate for every public operation: only `Ready` proceeds.
    async fn ensure_ready(&self) -> AppResult<()> {
        let status = self.status.read().await;
        match status.phase {
            IndexPhase::Ready => Ok(()),
            IndexPhase::Uninitialized => {
                Err(AppError::NotReady("index has not started building".to_string()))
            }
            IndexPhase::Building => Err(AppError::NotReady(format!(
                "index build in progress ({}/{})",
                status.processed, status.total
            ))),
            IndexPhase::Failed => Err(AppError::NotReady(format!(
                "index build failed: {}",
                status.error.as_deref().unwrap_or("unknown error")
            ))),
        }
    }

    /// Current readiness, size, and progress.
    pub async fn health(&self) -> HealthReport {
        let status = self.status.read().await.clone();
        let size = self
            .inner
            .read()
            .await
            .as_ref()
            .map(|inner| inner.store.len())
            .unwrap_or(0);

        HealthReport {
            ready: status.is_ready(),
            phase: status.phase,
            size,
            progress: Progress {
                total: status.total,
                processed: status.processed,
            },
            error: status.error,
        }
    }

    /// Search for the products most similar to a query (image URL or text).
    ///
    /// The query is embedded under the configured source policy; results
    /// carry the product snapshots captured at index time. Deletions made
    /// through [`SearchIndex::delete`] are reflected; other source-side
    /// changes are stale by design until the product is re-added.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchHit>> {
        self.ensure_ready().await?;

        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Embed("Query is empty".to_string()));
        }

        // Embed outside any lock: a slow image fetch must not stall other
        // searches.
        let vector = self.embedder.embed(query, self.policy).await?;

        let guard = self.inner.read().await;
        let inner = guard.as_ref().ok_or_else(not_loaded)?;
        let rows = inner.store.search(&vector, top_k)?;

        let hits = rows
            .into_iter()
            .filter_map(|(row, similarity)| {
                inner.mapping.get(row).map(|product| SearchHit {
                    product: product.clone(),
                    similarity,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Add a product to the index by id, fetching its snapshot from the
    /// data source.
    ///
    /// An id already present is replaced: the old row is removed via the
    /// delete-rebuild protocol and the fresh embedding appended, so the id
    /// never appears twice. A fresh id takes the fast path: a plain
    /// append with no rebuild.
    pub async fn add(&self, product_id: u64) -> AppResult<()> {
        self.ensure_ready().await?;
        let _mutation = self.mutation.lock().await;

        let record = self
            .router
            .fetch_one(product_id)
            .await?
            .ok_or(AppError::NotFound(product_id))?;

        if record.is_deleted {
            return Err(AppError::AlreadyDeleted(product_id));
        }

        let vector = build::embed_product(&self.embedder, &record, self.policy).await?;

        let replacing = {
            let guard = self.inner.read().await;
            guard
                .as_ref()
                .map(|inner| inner.mapping.contains(product_id))
                .unwrap_or(false)
        };

        if replacing {
            // Prepare the rebuilt pair outside the write lock; readers see
            // a single swap with the replacement already applied.
            let mut rebuilt = {
                let guard = self.inner.read().await;
                let inner = guard.as_ref().ok_or_else(not_loaded)?;
                inner.without(product_id)?
            };
            rebuilt.append_pair(&vector, record)?;
            *self.inner.write().await = Some(rebuilt);
            info!("Replaced product {} in index", product_id);
        } else {
            let mut guard = self.inner.write().await;
            let inner = guard.as_mut().ok_or_else(not_loaded)?;
            let row = inner.append_pair(&vector, record)?;
            debug!("Appended product {} at row {}", product_id, row);
        }

        self.persist_current().await
    }

    /// Remove a product from the index.
    ///
    /// The vector store has no native delete, so removal rebuilds the pair
    /// from the surviving rows (vectors reused, relative order preserved)
    /// and swaps it in atomically.
    pub async fn delete(&self, product_id: u64) -> AppResult<()> {
        self.ensure_ready().await?;
        let _mutation = self.mutation.lock().await;

        let rebuilt = {
            let guard = self.inner.read().await;
            let inner = guard.as_ref().ok_or_else(not_loaded)?;
            if !inner.mapping.contains(product_id) {
                return Err(AppError::NotFound(product_id));
            }
            inner.without(product_id)?
        };

        let remaining = rebuilt.store.len();
        *self.inner.write().await = Some(rebuilt);
        info!(
            "Deleted product {} from index ({} rows remain)",
            product_id, remaining
        );

        self.persist_current().await
    }

    /// Persist the current pair after a mutation.
    ///
    /// A failure here does not roll back the in-memory mutation: the index
    /// stays live, the error is surfaced to the caller and recorded in the
    /// health report until a later persist succeeds.
    async fn persist_current(&self) -> AppResult<()> {
        let result = {
            let guard = self.inner.read().await;
            let inner = guard.as_ref().ok_or_else(not_loaded)?;
            persist::save(
                &inner.store,
                &inner.mapping,
                self.embedder.model_name(),
                &self.paths,
            )
        };

        match result {
            Ok(()) => {
                self.status.write().await.error = None;
                Ok(())
            }
            Err(e) => {
                error!("Failed to persist index after mutation: {}", e);
                self.status.write().await.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("embedder", &self.embedder)
            .field("router", &self.router)
            .field("policy", &self.policy)
            .finish()
    }
}
