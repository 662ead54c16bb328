//! Seed the catalog with demo sections and products.
//!
//! The YAML file has `sections` and `products` lists whose rows use the same
//! field names as the REST API. Rows are upserted by section code and SKU.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{error, info};

use ma_furniture_server::db::{ProductRepository, SectionRepository};
use ma_furniture_server::routes::migrate::{prepare_products, prepare_sections};

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub sections: Vec<Value>,
    #[serde(default)]
    pub products: Vec<Value>,
}

/// Rows written by a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sections: usize,
    pub products: usize,
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a row fails
/// validation, or a database operation fails.
pub async fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    info!(path = %file.display(), "Loading seed catalog");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file).await?;
    let catalog: SeedCatalog = serde_yaml::from_str(&content)?;

    info!(
        sections = catalog.sections.len(),
        products = catalog.products.len(),
        "Parsed seed file"
    );

    let pool = super::connect().await?;
    let summary = seed_catalog(&pool, catalog).await?;

    info!(
        sections = summary.sections,
        products = summary.products,
        "Seeding complete"
    );
    Ok(())
}

/// Validate every row, then upsert sections and products.
///
/// Nothing is written when any row is invalid.
///
/// # Errors
///
/// Returns an error listing the invalid rows, or a database error.
pub async fn seed_catalog(
    pool: &SqlitePool,
    catalog: SeedCatalog,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let sections = prepare_sections(catalog.sections);
    let products = prepare_products(catalog.products, Utc::now().timestamp_millis());

    let errors: Vec<String> = sections.errors.into_iter().chain(products.errors).collect();
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let section_repo = SectionRepository::new(pool);
    for record in &sections.records {
        section_repo.upsert(record).await?;
    }

    let product_repo = ProductRepository::new(pool);
    for record in &products.records {
        product_repo.upsert(record).await?;
    }

    Ok(SeedSummary {
        sections: sections.records.len(),
        products: products.records.len(),
    })
}
