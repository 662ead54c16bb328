//! In-process cache of product lookups by SKU.
//!
//! Entries live for 5 minutes. Any product or section write clears the whole
//! cache, since a section change can alter many products at once.

use std::time::Duration;

use moka::future::Cache;
use sqlx::SqlitePool;

use ma_furniture_core::{Product, Sku};

use crate::db::{ProductRepository, RepositoryError};

/// Cached SKU lookups. Cheap to clone.
#[derive(Clone)]
pub struct SkuCache {
    cache: Cache<Sku, Product>,
}

impl Default for SkuCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SkuCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Look up a product by SKU, loading it from the database on a miss.
    ///
    /// Misses are not cached, so a newly created product is found right away.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database lookup fails.
    pub async fn get_or_load(
        &self,
        pool: &SqlitePool,
        sku: &Sku,
    ) -> Result<Option<Product>, RepositoryError> {
        if let Some(product) = self.cache.get(sku).await {
            tracing::debug!(sku = %sku, "SKU cache hit");
            return Ok(Some(product));
        }

        let product = ProductRepository::new(pool).get_by_sku(sku).await?;
        if let Some(ref product) = product {
            self.cache.insert(sku.clone(), product.clone()).await;
        }
        Ok(product)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of cached entries, after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
