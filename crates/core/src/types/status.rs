//! Stock availability status.

use serde::{Deserialize, Serialize};

/// Stock level below which a product is shown as running low.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Availability of a product derived from its stock count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "remaining", rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock(i64),
    OutOfStock,
}

impl StockStatus {
    /// Derive the status from a stock count.
    #[must_use]
    pub const fn from_stock(stock: i64) -> Self {
        match stock {
            n if n <= 0 => Self::OutOfStock,
            n if n < LOW_STOCK_THRESHOLD => Self::LowStock(n),
            _ => Self::InStock,
        }
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }

    /// Shopper-facing label.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::InStock => "В наличии".to_string(),
            Self::LowStock(n) => format!("Осталось {n} шт."),
            Self::OutOfStock => "Нет в наличии".to_string(),
        }
    }
}
