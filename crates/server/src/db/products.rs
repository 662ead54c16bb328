//! Product repository for database operations.
//!
//! Prices are stored as integer kopecks. `features`, `specifications`, and
//! `images` are JSON text columns; a corrupted value reads back as empty and
//! is logged rather than failing the whole query.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use ma_furniture_core::catalog::{ProductRecord, rank_search};
use ma_furniture_core::{CatalogStats, Price, Product, ProductFilter, ProductId, Sku, SortOrder};

use super::{ImportOutcome, RepositoryError};

/// Conflict message for a duplicate SKU.
pub const DUPLICATE_SKU: &str = "Product with this SKU already exists";

const PRODUCT_COLUMNS: &str = "id, sku, name, price_kopecks, category, section, stock, \
    description, features, specifications, badge, active, featured, images, \
    created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List products matching `filter` in the given order.
    ///
    /// Field filters run in SQL. The search term is matched case-insensitively
    /// in Rust so that Cyrillic text folds correctly, and paging is applied
    /// after it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored SKU or price is invalid.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"
        ));

        if let Some(active) = filter.active {
            qb.push(" AND active = ").push_bind(active);
        }
        if let Some(featured) = filter.featured {
            qb.push(" AND featured = ").push_bind(featured);
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            qb.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(section) = filter.section.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND section = ").push_bind(section.to_string());
        }
        qb.push(" ORDER BY ").push(sort.sql());

        let searching = filter.search_term().is_some();
        if !searching {
            push_paging(&mut qb, limit, offset);
        }

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if !searching {
            return Ok(products);
        }

        let skip = offset.and_then(|o| usize::try_from(o).ok()).unwrap_or(0);
        let take = limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(products
            .into_iter()
            .filter(|p| filter.matches(p))
            .skip(skip)
            .take(take)
            .collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get a product by SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?"))
                .bind(sku.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Active products of a section, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_section(&self, code: &str) -> Result<Vec<Product>, RepositoryError> {
        self.list(
            &ProductFilter::active_in_section(code),
            SortOrder::Newest,
            None,
            None,
        )
        .await
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: &ProductRecord) -> Result<Product, RepositoryError> {
        let columns = RecordColumns::encode(record)?;

        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO products (sku, name, price_kopecks, category, section, stock,
                description, features, specifications, badge, active, featured, images)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(record.sku.as_str())
        .bind(&record.name)
        .bind(columns.price_kopecks)
        .bind(&record.category)
        .bind(&record.section)
        .bind(record.stock)
        .bind(&record.description)
        .bind(&columns.features)
        .bind(&columns.specifications)
        .bind(&record.badge)
        .bind(record.active)
        .bind(record.featured)
        .bind(&columns.images)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_SKU))?;

        Product::try_from(row)
    }

    /// Overwrite every field of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Conflict` if the new SKU belongs to another product.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        record: &ProductRecord,
    ) -> Result<Product, RepositoryError> {
        let columns = RecordColumns::encode(record)?;

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE products
            SET sku = ?, name = ?, price_kopecks = ?, category = ?, section = ?, stock = ?,
                description = ?, features = ?, specifications = ?, badge = ?,
                active = ?, featured = ?, images = ?, updated_at = ?
            WHERE id = ?
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(record.sku.as_str())
        .bind(&record.name)
        .bind(columns.price_kopecks)
        .bind(&record.category)
        .bind(&record.section)
        .bind(record.stock)
        .bind(&record.description)
        .bind(&columns.features)
        .bind(&columns.specifications)
        .bind(&record.badge)
        .bind(record.active)
        .bind(record.featured)
        .bind(&columns.images)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_SKU))?;

        row.map(Product::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a product, or overwrite the product with the same SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, record: &ProductRecord) -> Result<Product, RepositoryError> {
        let columns = RecordColumns::encode(record)?;

        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO products (sku, name, price_kopecks, category, section, stock,
                description, features, specifications, badge, active, featured, images)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (sku) DO UPDATE SET
                name = excluded.name,
                price_kopecks = excluded.price_kopecks,
                category = excluded.category,
                section = excluded.section,
                stock = excluded.stock,
                description = excluded.description,
                features = excluded.features,
                specifications = excluded.specifications,
                badge = excluded.badge,
                active = excluded.active,
                featured = excluded.featured,
                images = excluded.images,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(record.sku.as_str())
        .bind(&record.name)
        .bind(columns.price_kopecks)
        .bind(&record.category)
        .bind(&record.section)
        .bind(record.stock)
        .bind(&record.description)
        .bind(&columns.features)
        .bind(&columns.specifications)
        .bind(&record.badge)
        .bind(record.active)
        .bind(record.featured)
        .bind(&columns.images)
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }

    /// Delete a product, returning it so the caller can remove its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "DELETE FROM products WHERE id = ? RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Delete every product. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM products")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Move every product of section `old` to section `new`.
    ///
    /// Products stay active only if `new` is non-empty. Returns the number of
    /// products moved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reassign_section(&self, old: &str, new: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET section = ?, active = ?, updated_at = ?
            WHERE section = ?
            ",
        )
        .bind(new)
        .bind(!new.is_empty())
        .bind(Utc::now())
        .bind(old)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Search active products, best matches first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        section: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let filter = ProductFilter {
            active: Some(true),
            category: category.map(ToString::to_string),
            section: section.map(ToString::to_string),
            ..ProductFilter::default()
        };
        let candidates = self.list(&filter, SortOrder::Newest, None, None).await?;

        Ok(rank_search(candidates, query))
    }

    /// Aggregate catalog counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<CatalogStats, RepositoryError> {
        let row: StatsRow = sqlx::query_as(
            r"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(CASE WHEN active = 1 THEN 1 ELSE 0 END), 0) AS active_products,
                COALESCE(SUM(CASE WHEN featured = 1 THEN 1 ELSE 0 END), 0) AS featured_products,
                COUNT(DISTINCT category) AS categories_count,
                COUNT(DISTINCT NULLIF(section, '')) AS sections_count,
                (SELECT COUNT(*) FROM sections) AS total_sections
            FROM products
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Insert products in one transaction, skipping SKUs that already exist.
    ///
    /// Skipped and failing rows are reported in the outcome and do not stop
    /// the import.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction cannot be
    /// started or committed.
    pub async fn import(&self, records: &[ProductRecord]) -> Result<ImportOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ImportOutcome::default();

        for record in records {
            let columns = match RecordColumns::encode(record) {
                Ok(columns) => columns,
                Err(e) => {
                    outcome.errors.push(format!("Product {}: {e}", record.name));
                    continue;
                }
            };

            let result = sqlx::query(
                r"
                INSERT OR IGNORE INTO products (sku, name, price_kopecks, category, section,
                    stock, description, features, specifications, badge, active, featured, images)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(record.sku.as_str())
            .bind(&record.name)
            .bind(columns.price_kopecks)
            .bind(&record.category)
            .bind(&record.section)
            .bind(record.stock)
            .bind(&record.description)
            .bind(&columns.features)
            .bind(&columns.specifications)
            .bind(&record.badge)
            .bind(record.active)
            .bind(record.featured)
            .bind(&columns.images)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => outcome.skipped.push(format!(
                    "Product {} ({}): {DUPLICATE_SKU}",
                    record.name,
                    record.sku.as_str()
                )),
                Ok(done) => outcome.inserted += done.rows_affected(),
                Err(e) => outcome.errors.push(format!("Product {}: {e}", record.name)),
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

fn push_paging(qb: &mut QueryBuilder<'_, Sqlite>, limit: Option<i64>, offset: Option<i64>) {
    match (limit, offset) {
        (None, None) => {}
        (limit, offset) => {
            // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
            qb.push(" LIMIT ").push_bind(limit.unwrap_or(-1));
            if let Some(offset) = offset {
                qb.push(" OFFSET ").push_bind(offset);
            }
        }
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Encoded forms of the columns that need conversion before binding.
struct RecordColumns {
    price_kopecks: i64,
    features: String,
    specifications: String,
    images: String,
}

impl RecordColumns {
    fn encode(record: &ProductRecord) -> Result<Self, RepositoryError> {
        Ok(Self {
            price_kopecks: record
                .price
                .to_kopecks()
                .map_err(|e| RepositoryError::DataCorruption(format!("price out of range: {e}")))?,
            features: serde_json::to_string(&record.features)?,
            specifications: serde_json::to_string(&record.specifications)?,
            images: serde_json::to_string(&record.images)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    sku: String,
    name: String,
    price_kopecks: i64,
    category: String,
    section: String,
    stock: i64,
    description: String,
    features: String,
    specifications: String,
    badge: String,
    active: bool,
    featured: bool,
    images: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let sku = Sku::parse(&row.sku).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid SKU in database: {e}"))
        })?;
        let price = Price::from_kopecks(row.price_kopecks).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            features: json_column(row.id, "features", &row.features),
            specifications: json_column(row.id, "specifications", &row.specifications),
            images: json_column(row.id, "images", &row.images),
            id: row.id,
            sku,
            name: row.name,
            price,
            category: row.category,
            section: row.section,
            stock: row.stock,
            description: row.description,
            badge: row.badge,
            active: row.active,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Decode a JSON column, falling back to the empty value.
fn json_column<T: DeserializeOwned + Default>(id: ProductId, column: &str, raw: &str) -> T {
    if raw.trim().is_empty() {
        return T::default();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(product_id = %id, column, error = %e, "Corrupted JSON column, using empty value");
        T::default()
    })
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total_products: i64,
    active_products: i64,
    featured_products: i64,
    categories_count: i64,
    sections_count: i64,
    total_sections: i64,
}

impl From<StatsRow> for CatalogStats {
    fn from(row: StatsRow) -> Self {
        Self {
            total_products: row.total_products,
            active_products: row.active_products,
            featured_products: row.featured_products,
            categories_count: row.categories_count,
            sections_count: row.sections_count,
            total_sections: row.total_sections,
        }
    }
}
