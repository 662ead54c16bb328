//! Cart route handlers.
//!
//! The cart is kept in the shopper's session. Product name, price, and image
//! are copied from the catalog when a product is first added; clients only
//! send product IDs.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use ma_furniture_core::{
    Cart, CartLine, CartNotice, Price, Product, ProductId, ProductSnapshot, StockStatus,
};

use crate::db::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::JsonBody;
use crate::middleware::{load_cart, save_cart};
use crate::routes::products::PRODUCT_NOT_FOUND;
use crate::state::AppState;

// =============================================================================
// Request and Response Types
// =============================================================================

/// Body naming a product. The ID may be a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub product_id: Value,
}

/// Body changing a line's quantity by `change`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: Value,
    pub change: i64,
}

/// One cart line with its computed subtotal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    #[serde(flatten)]
    pub line: CartLine,
    pub subtotal: Price,
    pub price_display: String,
    pub subtotal_display: String,
}

/// The cart as returned by every cart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_items: u32,
    pub total: Price,
    pub total_display: String,
    /// Message to show the shopper after the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CartView {
    fn new(cart: &Cart, message: Option<String>) -> Self {
        let total = cart.total();
        Self {
            items: cart
                .lines()
                .iter()
                .map(|line| CartItemView {
                    subtotal: line.subtotal(),
                    price_display: line.price.display(),
                    subtotal_display: line.subtotal().display(),
                    line: line.clone(),
                })
                .collect(),
            total_items: cart.total_items(),
            total,
            total_display: total.display(),
            message,
        }
    }
}

fn parse_product_id(value: &Value) -> Result<ProductId> {
    let id = match value {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0).map(ProductId::new),
        Value::String(s) => ProductId::parse_positive(s),
        _ => None,
    };
    id.ok_or_else(|| AppError::BadRequest("Invalid product ID".to_string()))
}

/// The first notice wins; otherwise `fallback`.
fn notice_message(notices: [Option<CartNotice>; 2], fallback: Option<String>) -> Option<String> {
    notices
        .into_iter()
        .flatten()
        .next()
        .map(|n| n.message().to_string())
        .or(fallback)
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::new(&cart, None)))
}

/// Add one unit of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<ProductRequest>,
) -> Result<Json<CartView>> {
    let product_id = parse_product_id(&body.product_id)?;

    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .filter(Product::is_visible)
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    if product.stock_status() == StockStatus::OutOfStock {
        return Err(AppError::BadRequest("Product is out of stock".to_string()));
    }

    let mut cart = load_cart(&session).await?;
    let added = cart.add(ProductSnapshot::from(&product));
    let saved = save_cart(&session, &mut cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", product_id.to_string())],
    );
    let message = notice_message(
        [added, saved],
        Some(format!("\"{}\" добавлен в корзину", product.name)),
    );
    Ok(Json(CartView::new(&cart, message)))
}

/// Change a line's quantity. Dropping below one removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    JsonBody(body): JsonBody<UpdateRequest>,
) -> Result<Json<CartView>> {
    let product_id = parse_product_id(&body.product_id)?;

    let mut cart = load_cart(&session).await?;
    let changed = cart.change_quantity(product_id, body.change);
    let saved = save_cart(&session, &mut cart).await?;

    Ok(Json(CartView::new(&cart, notice_message([changed, saved], None))))
}

/// Remove a product's line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    JsonBody(body): JsonBody<ProductRequest>,
) -> Result<Json<CartView>> {
    let product_id = parse_product_id(&body.product_id)?;

    let mut cart = load_cart(&session).await?;
    let removed = cart.remove(product_id);
    let saved = save_cart(&session, &mut cart).await?;

    let message = removed.then(|| "Товар удален из корзины".to_string());
    Ok(Json(CartView::new(&cart, notice_message([saved, None], message))))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut cart = Cart::new();
    save_cart(&session, &mut cart).await?;

    Ok(Json(CartView::new(&cart, Some("Корзина очищена".to_string()))))
}

/// Number of items in the cart, for the header badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<Value>> {
    let cart = load_cart(&session).await?;
    Ok(Json(json!({ "count": cart.total_items() })))
}
