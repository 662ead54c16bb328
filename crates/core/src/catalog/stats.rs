use serde::{Deserialize, Serialize};

/// Catalog counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_products: i64,
    pub active_products: i64,
    pub featured_products: i64,
    pub categories_count: i64,
    /// Distinct section codes referenced by products.
    pub sections_count: i64,
    pub total_sections: i64,
}
