//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod stats;
pub mod transfer;

use sqlx::SqlitePool;

use ma_furniture_server::config::get_database_url;
use ma_furniture_server::db;

/// Connect to the catalog database and bring its schema up to date.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub async fn connect() -> Result<SqlitePool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("MA_DATABASE_URL");
    let pool = db::create_pool(&database_url).await?;
    db::migrate(&pool).await?;
    Ok(pool)
}
