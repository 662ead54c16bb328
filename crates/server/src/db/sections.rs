//! Section repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use ma_furniture_core::catalog::SectionRecord;
use ma_furniture_core::{Section, SectionId};

use super::{ImportOutcome, RepositoryError};

/// Conflict message for a duplicate section code.
pub const DUPLICATE_CODE: &str = "Section with this code already exists";

/// Repository for section database operations.
pub struct SectionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SectionRepository<'a> {
    /// Create a new section repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List sections ordered by name, optionally only active or inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active: Option<bool>) -> Result<Vec<Section>, RepositoryError> {
        let rows: Vec<SectionRow> = match active {
            Some(active) => {
                sqlx::query_as(
                    "SELECT id, name, code, active, created_at FROM sections \
                     WHERE active = ? ORDER BY name",
                )
                .bind(active)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, name, code, active, created_at FROM sections ORDER BY name",
                )
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Section::from).collect())
    }

    /// Get a section by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SectionId) -> Result<Option<Section>, RepositoryError> {
        let row: Option<SectionRow> =
            sqlx::query_as("SELECT id, name, code, active, created_at FROM sections WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Section::from))
    }

    /// Get a section by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Section>, RepositoryError> {
        let row: Option<SectionRow> = sqlx::query_as(
            "SELECT id, name, code, active, created_at FROM sections WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Section::from))
    }

    /// Create a section.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: &SectionRecord) -> Result<Section, RepositoryError> {
        let row: SectionRow = sqlx::query_as(
            r"
            INSERT INTO sections (name, code, active)
            VALUES (?, ?, ?)
            RETURNING id, name, code, active, created_at
            ",
        )
        .bind(&record.name)
        .bind(&record.code)
        .bind(record.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_CODE))?;

        Ok(row.into())
    }

    /// Update a section.
    ///
    /// Renaming the code moves the section's products to the new code in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no section has this ID.
    /// Returns `RepositoryError::Conflict` if the new code belongs to another section.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: SectionId,
        record: &SectionRecord,
    ) -> Result<Section, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old_code: Option<(String,)> = sqlx::query_as("SELECT code FROM sections WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((old_code,)) = old_code else {
            return Err(RepositoryError::NotFound);
        };

        let row: SectionRow = sqlx::query_as(
            r"
            UPDATE sections SET name = ?, code = ?, active = ?
            WHERE id = ?
            RETURNING id, name, code, active, created_at
            ",
        )
        .bind(&record.name)
        .bind(&record.code)
        .bind(record.active)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_CODE))?;

        if old_code != record.code {
            let moved = sqlx::query("UPDATE products SET section = ?, updated_at = ? WHERE section = ?")
                .bind(&record.code)
                .bind(Utc::now())
                .bind(&old_code)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tracing::info!(from = %old_code, to = %record.code, moved, "Section code renamed");
        }

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete a section.
    ///
    /// In one transaction, its products are taken out of the section and
    /// deactivated, then the section is removed. Returns the deleted section
    /// and the number of affected products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no section has this ID.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: SectionId) -> Result<(Section, u64), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<SectionRow> =
            sqlx::query_as("SELECT id, name, code, active, created_at FROM sections WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let section = Section::from(row.ok_or(RepositoryError::NotFound)?);

        let affected = sqlx::query(
            "UPDATE products SET section = '', active = 0, updated_at = ? WHERE section = ?",
        )
        .bind(Utc::now())
        .bind(&section.code)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM sections WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((section, affected))
    }

    /// Insert a section, or overwrite the name and status of the section with
    /// the same code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, record: &SectionRecord) -> Result<Section, RepositoryError> {
        let row: SectionRow = sqlx::query_as(
            r"
            INSERT INTO sections (name, code, active)
            VALUES (?, ?, ?)
            ON CONFLICT (code) DO UPDATE SET name = excluded.name, active = excluded.active
            RETURNING id, name, code, active, created_at
            ",
        )
        .bind(&record.name)
        .bind(&record.code)
        .bind(record.active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete every section. Products keep their section codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sections")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert sections in one transaction, skipping codes that already exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction cannot be
    /// started or committed.
    pub async fn import(&self, records: &[SectionRecord]) -> Result<ImportOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ImportOutcome::default();

        for record in records {
            let result =
                sqlx::query("INSERT OR IGNORE INTO sections (name, code, active) VALUES (?, ?, ?)")
                    .bind(&record.name)
                    .bind(&record.code)
                    .bind(record.active)
                    .execute(&mut *tx)
                    .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => outcome.skipped.push(format!(
                    "Section {} ({}): {DUPLICATE_CODE}",
                    record.name, record.code
                )),
                Ok(done) => outcome.inserted += done.rows_affected(),
                Err(e) => outcome.errors.push(format!("Section {}: {e}", record.name)),
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct SectionRow {
    id: SectionId,
    name: String,
    code: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<SectionRow> for Section {
    fn from(row: SectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ma_furniture_core::{ProductFilter, ProductInput, SortOrder};

    use super::*;
    use crate::db::{ProductRepository, create_memory_pool};

    fn section(name: &str, code: &str) -> SectionRecord {
        SectionRecord {
            name: name.to_string(),
            code: code.to_string(),
            active: true,
        }
    }

    async fn add_product(pool: &SqlitePool, sku: &str, section: &str) {
        let record = serde_json::from_value::<ProductInput>(serde_json::json!({
            "sku": sku, "name": "Шкаф", "price": 30000, "category": "wardrobe", "section": section
        }))
        .unwrap()
        .into_record(0)
        .unwrap();
        ProductRepository::new(pool).create(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let pool = create_memory_pool().await.unwrap();
        let repo = SectionRepository::new(&pool);

        let mut hidden = section("Архив", "archive");
        hidden.active = false;
        repo.create(&hidden).await.unwrap();

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].code, "archive");

        let active = repo.list(Some(true)).await.unwrap();
        assert_eq!(active.len(), 4);
        assert!(active.iter().all(|s| s.active));
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let pool = create_memory_pool().await.unwrap();
        let repo = SectionRepository::new(&pool);

        let err = repo.create(&section("Ещё классика", "classic")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m == DUPLICATE_CODE));
    }

    #[tokio::test]
    async fn test_update_renames_product_sections() {
        let pool = create_memory_pool().await.unwrap();
        let repo = SectionRepository::new(&pool);
        add_product(&pool, "MF001", "modern").await;

        let modern = repo.get_by_code("modern").await.unwrap().unwrap();
        let updated = repo
            .update(modern.id, &section("Модерн", "modern-2025"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Модерн");

        let moved = ProductRepository::new(&pool)
            .list_by_section("modern-2025")
            .await
            .unwrap();
        assert_eq!(moved.len(), 1);

        let err = repo
            .update(SectionId::new(999), &section("X", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_deactivates_products() {
        let pool = create_memory_pool().await.unwrap();
        let repo = SectionRepository::new(&pool);
        add_product(&pool, "MF001", "classic").await;
        add_product(&pool, "MF002", "classic").await;
        add_product(&pool, "MF003", "modern").await;

        let classic = repo.get_by_code("classic").await.unwrap().unwrap();
        let (deleted, affected) = repo.delete(classic.id).await.unwrap();
        assert_eq!(deleted.code, "classic");
        assert_eq!(affected, 2);
        assert!(repo.get(classic.id).await.unwrap().is_none());

        let orphaned = ProductRepository::new(&pool)
            .list(
                &ProductFilter {
                    active: Some(false),
                    ..ProductFilter::default()
                },
                SortOrder::Newest,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(orphaned.len(), 2);
        assert!(orphaned.iter().all(|p| p.section.is_empty()));

        assert!(matches!(
            repo.delete(classic.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_import_and_upsert() {
        let pool = create_memory_pool().await.unwrap();
        let repo = SectionRepository::new(&pool);

        let outcome = repo
            .import(&[section("Классика", "classic"), section("Лофт", "loft")])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(
            outcome.skipped,
            vec![format!("Section Классика (classic): {DUPLICATE_CODE}")]
        );

        let mut loft = section("Лофт и индастриал", "loft");
        loft.active = false;
        let upserted = repo.upsert(&loft).await.unwrap();
        assert_eq!(upserted.name, "Лофт и индастриал");
        assert!(!upserted.active);
        assert_eq!(repo.list(None).await.unwrap().len(), 5);
    }
}
