//! MySQL-backed primary product source.

use async_trait::async_trait;
use lookalike_core::{AppError, AppResult};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::FromRow;

use crate::product::{parse_image_urls, ProductRecord};
use crate::source::ProductSource;

/// Raw row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    image_urls: Option<String>,
    is_deleted: bool,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        ProductRecord {
            id: row.id.max(0) as u64,
            name: row.name,
            description: row.description.unwrap_or_default(),
            image_urls: row
                .image_urls
                .as_deref()
                .map(parse_image_urls)
                .unwrap_or_default(),
            is_deleted: row.is_deleted,
        }
    }
}

/// Primary product source reading the live `products` table.
#[derive(Debug, Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Create a source with a lazily-connected pool.
    ///
    /// No connection is attempted here; reachability is observed on the
    /// first query, which is what lets the build pipeline fall back to the
    /// dump when the database is down.
    pub fn connect_lazy(url: &str) -> AppResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(|e| AppError::Source(format!("Invalid MySQL URL: {}", e)))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ProductSource for MySqlSource {
    fn label(&self) -> &'static str {
        "mysql"
    }

    async fn fetch_one(&self, product_id: u64) -> AppResult<Option<ProductRecord>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, image_urls, is_deleted \
             FROM products WHERE id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Source(format!("MySQL query failed: {}", e)))?;

        Ok(row.map(ProductRecord::from))
    }

    async fn fetch_all(&self) -> AppResult<Vec<ProductRecord>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, image_urls, is_deleted \
             FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Source(format!("MySQL scan failed: {}", e)))?;

        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }
}
