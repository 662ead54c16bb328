//! MA Furniture Core - Shared catalog and cart library.
//!
//! This crate provides the domain model used across all MA Furniture components:
//! - `server` - REST API over the product catalog and shopper carts
//! - `cli` - Command-line tools for migrations, seeding, and import/export
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps the catalog rules testable in isolation and
//! identical between the server and the CLI.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, SKUs, prices, and stock status
//! - [`catalog`] - Products, sections, filtering, sorting, pagination, search ranking
//! - [`cart`] - Cart line items and quantity rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::{Cart, CartLine, CartNotice, ProductSnapshot};
pub use catalog::{
    CatalogStats, Page, PageLink, Product, ProductFilter, ProductInput, Section, SectionInput,
    SortOrder, ValidationError,
};
pub use types::*;
