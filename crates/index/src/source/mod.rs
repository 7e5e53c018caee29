//! Product data sources: the live table and the static dump fallback.

pub mod dump;
pub mod mysql;

pub use dump::DumpSource;
pub use mysql::MySqlSource;

use async_trait::async_trait;
use lookalike_core::{AppConfig, AppError, AppResult};
use tracing::{info, warn};

use crate::product::ProductRecord;

/// A source of product rows.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Short name used in logs ("mysql", "dump").
    fn label(&self) -> &'static str;

    /// Fetch a single product by id. `Ok(None)` means the id is unknown.
    async fn fetch_one(&self, product_id: u64) -> AppResult<Option<ProductRecord>>;

    /// Enumerate every product row in source order.
    async fn fetch_all(&self) -> AppResult<Vec<ProductRecord>>;
}

/// Ordered data-source policy: the live table when configured and
/// reachable, the static dump otherwise.
///
/// The policy is evaluated once per operation: a build or an add commits
/// to one source rather than mixing rows from both.
pub struct SourceRouter {
    primary: Option<MySqlSource>,
    fallback: DumpSource,
}

impl SourceRouter {
    /// Create a router from explicit sources. `primary: None` means the
    /// service runs from the dump alone.
    pub fn new(primary: Option<MySqlSource>, fallback: DumpSource) -> Self {
        Self { primary, fallback }
    }

    /// Create a router from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let primary = match &config.mysql_url {
            Some(url) => Some(MySqlSource::connect_lazy(url)?),
            None => None,
        };
        let fallback = DumpSource::new(config.dump_path.clone());
        Ok(Self::new(primary, fallback))
    }

    /// Enumerate all products, deciding the source once.
    ///
    /// The primary is preferred; an unreachable or empty primary falls back
    /// to the dump. Returns the label of the source actually used. When no
    /// source yields rows and none was reachable, the error reports an
    /// unbuildable index.
    pub async fn fetch_all(&self) -> AppResult<(&'static str, Vec<ProductRecord>)> {
        let mut primary_reachable = false;

        if let Some(primary) = &self.primary {
            match primary.fetch_all().await {
                Ok(rows) if !rows.is_empty() => {
                    info!("Enumerated {} products from {}", rows.len(), primary.label());
                    return Ok((primary.label(), rows));
                }
                Ok(_) => {
                    warn!("Primary source returned no rows, trying fallback");
                    primary_reachable = true;
                }
                Err(e) => {
                    warn!("Primary source unavailable ({}), trying fallback", e);
                }
            }
        }

        match self.fallback.fetch_all().await {
            Ok(rows) => {
                info!("Enumerated {} products from {}", rows.len(), self.fallback.label());
                Ok((self.fallback.label(), rows))
            }
            Err(e) if primary_reachable => {
                // The primary was reachable but empty; an empty index is a
                // valid build result.
                warn!("Fallback source unavailable ({}), using empty primary result", e);
                Ok(("mysql", Vec::new()))
            }
            Err(e) => Err(AppError::Source(format!(
                "No reachable product source: {}",
                e
            ))),
        }
    }

    /// Fetch one product, deciding the source once: the primary when
    /// configured, otherwise the dump.
    pub async fn fetch_one(&self, product_id: u64) -> AppResult<Option<ProductRecord>> {
        match &self.primary {
            Some(primary) => primary.fetch_one(product_id).await,
            None => self.fallback.fetch_one(product_id).await,
        }
    }
}

impl std::fmt::Debug for SourceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRouter")
            .field("primary", &self.primary.as_ref().map(|p| p.label()))
            .field("fallback", &self.fallback.label())
            .finish()
    }
}
