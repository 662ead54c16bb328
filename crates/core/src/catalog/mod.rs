//! Catalog domain: products, sections, and the rules for listing them.
//!
//! Everything here is pure. The server's repositories persist these records
//! and the CLI reuses the same validation when importing files.

mod input;
mod product;
mod query;
mod section;
mod stats;
mod text;

pub use input::{ProductInput, ProductRecord, SectionInput, SectionRecord, ValidationError, parse_flag};
pub use product::{Product, Specifications};
pub use query::{
    DEFAULT_PER_PAGE, Page, PageLink, ProductFilter, SearchRank, SortOrder, paginate, rank_search,
};
pub use section::Section;
pub use stats::CatalogStats;
pub use text::{CATEGORIES, category_label, parse_features, parse_specifications};
