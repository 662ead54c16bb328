//! Services used by the route handlers.
//!
//! # Services
//!
//! - `images` - Uploaded product image storage
//! - `cache` - Cached product lookups by SKU

pub mod cache;
pub mod images;

pub use cache::SkuCache;
pub use images::{ImageError, ImageStore};
