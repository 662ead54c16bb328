//! Catalog-wide read endpoints: statistics, search, and categories.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use ma_furniture_core::catalog::CATEGORIES;
use ma_furniture_core::{CatalogStats, Product};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::QueryParams;
use crate::state::AppState;

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub section: Option<String>,
}

/// Aggregate catalog counts.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<CatalogStats>> {
    Ok(Json(ProductRepository::new(state.pool()).stats().await?))
}

/// Search active products. Name matches rank before SKU matches, which rank
/// before description matches.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Json<Vec<Product>>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))?;

    let products = ProductRepository::new(state.pool())
        .search(
            q,
            query.category.as_deref().filter(|c| !c.is_empty()),
            query.section.as_deref().filter(|s| !s.is_empty()),
        )
        .await?;
    Ok(Json(products))
}

/// Category codes with their display labels.
pub async fn categories() -> Json<Map<String, Value>> {
    Json(
        CATEGORIES
            .iter()
            .map(|(code, label)| ((*code).to_string(), Value::String((*label).to_string())))
            .collect(),
    )
}
