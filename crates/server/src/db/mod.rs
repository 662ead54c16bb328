//! Database operations for the catalog `SQLite` database.
//!
//! ## Tables
//!
//! - `products` - Catalog products (prices in kopecks, JSON list/map columns)
//! - `sections` - Merchandising sections, referenced from products by code
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and embedded in the
//! binary. The server applies them on startup; they can also be run via:
//! ```bash
//! cargo run -p ma-furniture-cli -- migrate
//! ```

pub mod products;
pub mod sections;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use products::ProductRepository;
pub use sections::SectionRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A JSON column could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique SKU).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict` with `message`.
    pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_string());
        }
        Self::Database(e)
    }
}

/// Result of a bulk import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Rows actually inserted (existing keys are skipped).
    pub inserted: u64,
    /// Rows left out because their key already exists, formatted for display.
    pub skipped: Vec<String>,
    /// Per-row failures, formatted for display.
    pub errors: Vec<String>,
}

/// Create a `SQLite` connection pool.
///
/// The database file is created if missing. Connections use WAL journaling
/// and enforce foreign keys.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a single-connection in-memory database with migrations applied.
///
/// The connection is never recycled, so the data lives as long as the pool.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::migrate::MigrateError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Apply the embedded catalog migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the applied history
/// conflicts with the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_seed_default_sections() {
        let pool = create_memory_pool().await.unwrap();

        let codes: Vec<(String,)> = sqlx::query_as("SELECT code FROM sections ORDER BY code")
            .fetch_all(&pool)
            .await
            .unwrap();
        let codes: Vec<String> = codes.into_iter().map(|(c,)| c).collect();

        assert_eq!(codes, vec!["classic", "exclusive", "modern", "premium"]);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_memory_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_create_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());

        let pool = create_pool(&secrecy::SecretString::from(url)).await.unwrap();
        migrate(&pool).await.unwrap();

        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.0.to_lowercase(), "wal");
    }
}
