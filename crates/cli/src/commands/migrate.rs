//! Database migration command.
//!
//! Migrations are embedded from `crates/server/migrations/`; the server also
//! applies them on startup.

use tracing::info;

/// Run database migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Running catalog migrations...");
    let pool = super::connect().await?;
    pool.close().await;
    info!("Catalog migrations complete!");
    Ok(())
}
