//! Core types for MA Furniture.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod sku;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use sku::{Sku, SkuError};
pub use status::StockStatus;
