//! Catalog export and import as JSON.
//!
//! An export is an object with a `products` list, a `sections` list, or
//! both. Import accepts the same shape, so a backup made on one machine can
//! be restored on another.

use std::path::Path;

use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};

use ma_furniture_core::{Product, ProductFilter, Section, SortOrder};
use ma_furniture_server::db::{ProductRepository, RepositoryError, SectionRepository};
use ma_furniture_server::routes::migrate::{prepare_products, prepare_sections};

/// What an export contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    All,
    Products,
    Sections,
}

/// How imported rows combine with the existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Insert new rows and update existing ones by SKU or section code.
    Merge,
    /// Delete the existing rows of each imported list first.
    Replace,
}

/// Serialized export document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogExport {
    pub exported_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
}

/// Outcome of an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub products: usize,
    pub sections: usize,
    /// Rows skipped because they failed validation.
    pub skipped: Vec<String>,
}

/// Export the catalog to a file, or stdout when `output` is `None`.
///
/// # Errors
///
/// Returns an error if the database cannot be read or the file cannot be
/// written.
pub async fn export(
    kind: ExportKind,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let export = build_export(&pool, kind).await?;
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(
                path = %path.display(),
                products = export.products.as_ref().map_or(0, Vec::len),
                sections = export.sections.as_ref().map_or(0, Vec::len),
                "Catalog exported"
            );
        }
        None => {
            #[allow(clippy::print_stdout)]
            {
                println!("{json}");
            }
        }
    }
    Ok(())
}

/// Import a JSON export file.
///
/// # Errors
///
/// Returns an error if the file is unreadable or malformed, or if a
/// database operation fails.
pub async fn import(file: &Path, mode: ImportMode) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let content = tokio::fs::read_to_string(file).await?;
    let data: Value = serde_json::from_str(&content)?;

    let pool = super::connect().await?;
    let summary = import_catalog(&pool, data, mode).await?;

    for skipped in &summary.skipped {
        warn!("Skipped {skipped}");
    }
    info!(
        products = summary.products,
        sections = summary.sections,
        skipped = summary.skipped.len(),
        ?mode,
        "Catalog imported"
    );
    Ok(())
}

/// Read the requested lists from the database.
///
/// # Errors
///
/// Returns a database error.
pub async fn build_export(
    pool: &SqlitePool,
    kind: ExportKind,
) -> Result<CatalogExport, RepositoryError> {
    let products = match kind {
        ExportKind::All | ExportKind::Products => Some(
            ProductRepository::new(pool)
                .list(&ProductFilter::default(), SortOrder::default(), None, None)
                .await?,
        ),
        ExportKind::Sections => None,
    };
    let sections = match kind {
        ExportKind::All | ExportKind::Sections => {
            Some(SectionRepository::new(pool).list(None).await?)
        }
        ExportKind::Products => None,
    };

    Ok(CatalogExport {
        exported_at: Utc::now().to_rfc3339(),
        products,
        sections,
    })
}

/// Check the document shape and pull out its lists.
///
/// # Errors
///
/// Returns every shape problem found.
pub fn split_document(data: Value) -> Result<(Option<Vec<Value>>, Option<Vec<Value>>), Vec<String>> {
    let Value::Object(mut map) = data else {
        return Err(vec!["Import data must be a JSON object".to_string()]);
    };

    let mut errors = Vec::new();
    let mut take_list = |key: &str, message: &str| match map.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(rows)) => Some(rows),
        Some(_) => {
            errors.push(message.to_string());
            None
        }
    };
    let products = take_list("products", "Products data must be an array");
    let sections = take_list("sections", "Sections data must be an array");

    if errors.is_empty() {
        Ok((products, sections))
    } else {
        Err(errors)
    }
}

/// Import a parsed document. Sections are written before products.
///
/// # Errors
///
/// Returns an error if the document shape is invalid or a database
/// operation fails. Individual invalid rows are skipped and reported in the
/// summary.
pub async fn import_catalog(
    pool: &SqlitePool,
    data: Value,
    mode: ImportMode,
) -> Result<ImportSummary, Box<dyn std::error::Error>> {
    let (products, sections) = split_document(data).map_err(|errors| errors.join(", "))?;
    let mut summary = ImportSummary::default();

    if let Some(rows) = sections {
        let prepared = prepare_sections(rows);
        let repo = SectionRepository::new(pool);
        if mode == ImportMode::Replace {
            let removed = repo.delete_all().await?;
            info!(removed, "Existing sections deleted");
        }
        for record in &prepared.records {
            repo.upsert(record).await?;
        }
        summary.sections = prepared.records.len();
        summary.skipped.extend(prepared.errors);
    }

    if let Some(rows) = products {
        let prepared = prepare_products(rows, Utc::now().timestamp_millis());
        let repo = ProductRepository::new(pool);
        if mode == ImportMode::Replace {
            let removed = repo.delete_all().await?;
            info!(removed, "Existing products deleted");
        }
        for record in &prepared.records {
            repo.upsert(record).await?;
        }
        summary.products = prepared.records.len();
        summary.skipped.extend(prepared.errors);
    }

    Ok(summary)
}
