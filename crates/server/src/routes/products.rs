//! Product route handlers.
//!
//! Create and update accept either a multipart form (text fields plus up to
//! ten `images` files) or a JSON body with the same field names.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::instrument;

use ma_furniture_core::catalog::{PageLink, paginate, parse_flag};
use ma_furniture_core::{Page, Product, ProductFilter, ProductId, ProductInput, Sku, SortOrder};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{JsonBody, QueryParams};
use crate::services::images::{ImageError, ImageStore, MAX_IMAGES};
use crate::state::AppState;

pub(crate) const PRODUCT_NOT_FOUND: &str = "Product not found";

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub section: Option<String>,
    pub active: Option<String>,
    pub featured: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// When set, the response is a page object instead of a bare array.
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl ListQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            active: self.active.as_deref().map(parse_flag),
            category: self.category.clone(),
            section: self.section.clone(),
            featured: self.featured.as_deref().map(parse_flag),
            search: self.search.clone(),
        }
    }
}

/// A page of products with links for a pagination bar.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub links: Vec<PageLink>,
}

/// Body of the bulk section move.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    pub old_section: Option<String>,
    pub new_section: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Response> {
    let filter = query.filter();
    let sort = query.sort.as_deref().map(SortOrder::parse).unwrap_or_default();
    let repo = ProductRepository::new(state.pool());

    if let Some(page) = query.page {
        let products = repo.list(&filter, sort, None, None).await?;
        let page = paginate(products, page, query.per_page.unwrap_or_default());
        let links = page.window();
        return Ok(Json(ProductPage { page, links }).into_response());
    }

    let products = repo.list(&filter, sort, query.limit, query.offset).await?;
    Ok(Json(products).into_response())
}

/// Get a product by ID.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;

    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// Get a product by SKU.
#[instrument(skip(state))]
pub async fn show_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<Product>> {
    let sku = Sku::parse(&sku).map_err(|_| AppError::BadRequest("SKU is required".to_string()))?;

    state
        .sku_cache()
        .get_or_load(state.pool(), &sku)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// Active products of a section.
#[instrument(skip(state))]
pub async fn by_section(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list_by_section(&code)
        .await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip(state, form))]
pub async fn create(
    State(state): State<AppState>,
    form: ProductForm,
) -> Result<(StatusCode, Json<Product>)> {
    let mut record = form.input.into_record(Utc::now().timestamp_millis())?;

    let uploaded = save_uploads(state.images(), &form.uploads).await?;
    if !uploaded.is_empty() {
        record.images = uploaded.clone();
    }

    let product = match ProductRepository::new(state.pool()).create(&record).await {
        Ok(product) => product,
        Err(e) => {
            state.images().delete_all(&uploaded).await;
            return Err(e.into());
        }
    };
    state.invalidate_catalog().await;

    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product.
///
/// New uploads replace the image list. Uploaded files that the product no
/// longer references are deleted.
#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: ProductForm,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    let repo = ProductRepository::new(state.pool());

    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    let mut record = form.input.merge(&current)?;

    let uploaded = save_uploads(state.images(), &form.uploads).await?;
    if !uploaded.is_empty() {
        record.images = uploaded.clone();
    }

    let product = match repo.update(id, &record).await {
        Ok(product) => product,
        Err(e) => {
            state.images().delete_all(&uploaded).await;
            return Err(match e {
                RepositoryError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.to_string()),
                e => e.into(),
            });
        }
    };
    state.invalidate_catalog().await;

    let orphaned: Vec<String> = current
        .images
        .into_iter()
        .filter(|url| !product.images.contains(url))
        .collect();
    state.images().delete_all(&orphaned).await;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// Delete a product and its uploaded images.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let id = parse_product_id(&id)?;

    let product = ProductRepository::new(state.pool())
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    state.invalidate_catalog().await;
    state.images().delete_all(&product.images).await;

    tracing::info!(product_id = %product.id, sku = %product.sku, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// Move every product of one section to another.
///
/// An empty or missing `newSection` takes the products out of any section
/// and deactivates them.
#[instrument(skip(state))]
pub async fn update_section(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateSectionRequest>,
) -> Result<Json<Value>> {
    let old = body
        .old_section
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Old section code is required".to_string()))?;
    let new = body.new_section.as_deref().map_or("", str::trim);

    let updated = ProductRepository::new(state.pool())
        .reassign_section(old, new)
        .await?;
    state.invalidate_catalog().await;

    Ok(Json(json!({
        "message": "Products section updated successfully",
        "updatedCount": updated,
    })))
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse_positive(raw).ok_or_else(|| AppError::BadRequest("Invalid product ID".to_string()))
}

/// Save validated uploads, removing the ones already saved if one fails.
async fn save_uploads(store: &ImageStore, uploads: &[Upload]) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match store
            .save(
                upload.file_name.as_deref(),
                upload.content_type.as_deref(),
                &upload.bytes,
            )
            .await
        {
            Ok(url) => urls.push(url),
            Err(e) => {
                store.delete_all(&urls).await;
                return Err(e.into());
            }
        }
    }
    Ok(urls)
}

// =============================================================================
// Product Form Extractor
// =============================================================================

/// An uploaded image held in memory until the product validates.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Product fields from a multipart form or a JSON body.
#[derive(Debug)]
pub struct ProductForm {
    pub input: ProductInput,
    pub uploads: Vec<Upload>,
}

impl<S: Send + Sync> FromRequest<S> for ProductForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Self {
            input: parse_input(value)?,
            uploads: Vec::new(),
        })
    }
}

impl ProductForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut fields = Map::new();
        let mut uploads = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                insert_field(&mut fields, name, text);
                continue;
            }

            if name != "images" {
                continue;
            }
            let file_name = field.file_name().map(ToString::to_string);
            let content_type = field.content_type().map(ToString::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            // Browsers send an empty part when no file was chosen
            if bytes.is_empty() {
                continue;
            }
            if uploads.len() >= MAX_IMAGES {
                return Err(ImageError::TooMany { max: MAX_IMAGES }.into());
            }
            ImageStore::validate(content_type.as_deref(), bytes.len())?;
            uploads.push(Upload {
                file_name,
                content_type,
                bytes,
            });
        }

        Ok(Self {
            input: parse_input(Value::Object(fields))?,
            uploads,
        })
    }
}

fn parse_input(value: Value) -> Result<ProductInput> {
    serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid product data: {e}")))
}

/// Add a text form field. Repeated names collect into an array, and a value
/// that is a JSON array is decoded.
fn insert_field(fields: &mut Map<String, Value>, name: String, text: String) {
    let value = if text.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Value>>(&text).map_or(Value::String(text), Value::Array)
    } else {
        Value::String(text)
    };

    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_field_collects_repeats() {
        let mut fields = Map::new();
        insert_field(&mut fields, "name".to_string(), "Шкаф".to_string());
        insert_field(&mut fields, "features".to_string(), "Зеркало".to_string());
        insert_field(&mut fields, "features".to_string(), "Подсветка".to_string());
        insert_field(
            &mut fields,
            "images".to_string(),
            r#"["/uploads/products/a.jpg"]"#.to_string(),
        );
        insert_field(&mut fields, "badge".to_string(), "[new".to_string());

        assert_eq!(fields["name"], "Шкаф");
        assert_eq!(fields["features"], json!(["Зеркало", "Подсветка"]));
        assert_eq!(fields["images"], json!(["/uploads/products/a.jpg"]));
        assert_eq!(fields["badge"], "[new");

        let input = parse_input(Value::Object(fields)).unwrap();
        assert_eq!(
            input.features.unwrap(),
            vec!["Зеркало".to_string(), "Подсветка".to_string()]
        );
    }

    #[test]
    fn test_list_query_filter() {
        let query = ListQuery {
            active: Some("true".to_string()),
            featured: Some("false".to_string()),
            section: Some("modern".to_string()),
            ..ListQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.active, Some(true));
        assert_eq!(filter.featured, Some(false));
        assert_eq!(filter.section.as_deref(), Some("modern"));
        assert!(filter.category.is_none());
    }

    #[test]
    fn test_parse_product_id() {
        assert_eq!(parse_product_id("7").unwrap(), ProductId::new(7));
        assert!(matches!(parse_product_id("0"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_product_id("abc"), Err(AppError::BadRequest(_))));
    }
}
