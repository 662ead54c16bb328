//! Product record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId, Sku, StockStatus};

/// Ordered key/value specifications shown on the product page.
pub type Specifications = serde_json::Map<String, serde_json::Value>;

/// A catalog product as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub price: Price,
    pub category: String,
    /// Section code; empty when the product is not placed in any section.
    pub section: String,
    /// Units in stock.
    pub stock: i64,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: Specifications,
    pub badge: String,
    pub active: bool,
    pub featured: bool,
    /// Image URLs, either uploaded (`/uploads/products/...`) or external.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Availability derived from the stock count.
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }

    /// The first image, used for cards and cart lines.
    #[must_use]
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether shoppers can see this product.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.active && !self.section.is_empty()
    }
}
