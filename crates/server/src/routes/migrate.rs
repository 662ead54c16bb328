//! Import of catalog data exported from the shop's browser storage.
//!
//! Existing SKUs and section codes are skipped and listed in the response.
//! Rows that fail validation are reported by name and do not stop the import.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use ma_furniture_core::catalog::{ProductRecord, SectionRecord};
use ma_furniture_core::{ProductInput, SectionInput};

use crate::db::{ProductRepository, SectionRepository};
use crate::error::Result;
use crate::extract::JsonBody;
use crate::state::AppState;

/// Import body. Either list may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct MigrateRequest {
    #[serde(default)]
    pub products: Option<Vec<Value>>,
    #[serde(default)]
    pub sections: Option<Vec<Value>>,
}

/// Import summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateResponse {
    pub message: &'static str,
    pub migrated_products: u64,
    pub migrated_sections: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Validated rows plus the messages for rows that failed.
pub struct Prepared<T> {
    pub records: Vec<T>,
    pub errors: Vec<String>,
}

/// Display name of a raw row for error messages.
fn row_name(value: &Value) -> String {
    match value.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => "(unnamed)".to_string(),
    }
}

/// Validate raw product rows. SKUs are generated for rows without one.
///
/// Each row is stamped one millisecond after the previous one, so rows of a
/// batch whose names share a prefix still get distinct generated SKUs.
#[must_use]
pub fn prepare_products(rows: Vec<Value>, now_millis: i64) -> Prepared<ProductRecord> {
    let mut prepared = Prepared {
        records: Vec::with_capacity(rows.len()),
        errors: Vec::new(),
    };

    let mut stamp = now_millis;
    for row in rows {
        let name = row_name(&row);
        let record = serde_json::from_value::<ProductInput>(row)
            .map_err(|e| e.to_string())
            .and_then(|input| input.into_record(stamp).map_err(|e| e.to_string()));
        stamp = stamp.saturating_add(1);
        match record {
            Ok(record) => prepared.records.push(record),
            Err(e) => prepared.errors.push(format!("Product {name}: {e}")),
        }
    }
    prepared
}

/// Validate raw section rows.
#[must_use]
pub fn prepare_sections(rows: Vec<Value>) -> Prepared<SectionRecord> {
    let mut prepared = Prepared {
        records: Vec::with_capacity(rows.len()),
        errors: Vec::new(),
    };

    for row in rows {
        let name = row_name(&row);
        let record = serde_json::from_value::<SectionInput>(row)
            .map_err(|e| e.to_string())
            .and_then(|input| input.into_record().map_err(|e| e.to_string()));
        match record {
            Ok(record) => prepared.records.push(record),
            Err(e) => prepared.errors.push(format!("Section {name}: {e}")),
        }
    }
    prepared
}

/// Import sections, then products.
#[instrument(skip(state, body))]
pub async fn migrate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MigrateRequest>,
) -> Result<Json<MigrateResponse>> {
    let sections = prepare_sections(body.sections.unwrap_or_default());
    let products = prepare_products(
        body.products.unwrap_or_default(),
        Utc::now().timestamp_millis(),
    );

    let section_outcome = SectionRepository::new(state.pool())
        .import(&sections.records)
        .await?;
    let product_outcome = ProductRepository::new(state.pool())
        .import(&products.records)
        .await?;
    state.invalidate_catalog().await;

    let skipped: Vec<String> = section_outcome
        .skipped
        .into_iter()
        .chain(product_outcome.skipped)
        .collect();
    let errors: Vec<String> = sections
        .errors
        .into_iter()
        .chain(section_outcome.errors)
        .chain(products.errors)
        .chain(product_outcome.errors)
        .collect();

    tracing::info!(
        products = product_outcome.inserted,
        sections = section_outcome.inserted,
        skipped = skipped.len(),
        errors = errors.len(),
        "Browser storage import completed"
    );

    Ok(Json(MigrateResponse {
        message: "Migration completed",
        migrated_products: product_outcome.inserted,
        migrated_sections: section_outcome.inserted,
        skipped,
        errors,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_prepare_products_reports_invalid_rows() {
        let prepared = prepare_products(
            vec![
                json!({ "name": "Пантограф", "price": 15000, "category": "pantograph", "section": "classic" }),
                json!({ "name": "Без цены", "category": "kitchen" }),
                json!("not an object"),
            ],
            1_700_000_000_000,
        );

        assert_eq!(prepared.records.len(), 1);
        assert_eq!(prepared.records[0].sku.as_str(), "MFПАН000000");
        assert_eq!(prepared.errors.len(), 2);
        assert_eq!(prepared.errors[0], "Product Без цены: Valid price is required");
        assert!(prepared.errors[1].starts_with("Product (unnamed): "));
    }

    #[test]
    fn test_prepare_products_gives_batch_distinct_skus() {
        let rows = ["Пантограф Classic", "Пантограф Premium", "Пантограф Mini"]
            .iter()
            .map(|name| json!({ "name": name, "price": 15000, "category": "pantograph" }))
            .collect();
        let prepared = prepare_products(rows, 1_700_000_000_000);

        let skus: Vec<&str> = prepared.records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, ["MFПАН000000", "MFПАН000001", "MFПАН000002"]);
    }

    #[test]
    fn test_prepare_sections() {
        let prepared = prepare_sections(vec![
            json!({ "name": "Лофт", "code": "loft", "active": false }),
            json!({ "name": "Без кода" }),
        ]);

        assert_eq!(prepared.records.len(), 1);
        assert!(!prepared.records[0].active);
        assert_eq!(prepared.errors, vec!["Section Без кода: Name and code are required"]);
    }
}
