//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::services::{ImageStore, SkuCache};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    images: ImageStore,
    sku_cache: SkuCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `SQLite` connection pool
    #[must_use]
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let images = ImageStore::new(config.upload_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                images,
                sku_cache: SkuCache::new(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the uploaded image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Get a reference to the SKU lookup cache.
    #[must_use]
    pub fn sku_cache(&self) -> &SkuCache {
        &self.inner.sku_cache
    }

    /// Forget cached catalog data after a write.
    pub async fn invalidate_catalog(&self) {
        self.inner.sku_cache.invalidate_all().await;
    }
}
