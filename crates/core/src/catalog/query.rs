//! Filtering, sorting, pagination, and search ranking over products.
//!
//! The server pushes filters and ordering down to SQL; these in-memory
//! versions define the same semantics and are used for ranking search
//! results and for paging lists that were already fetched.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Product;

/// Products per page on the shop listing.
pub const DEFAULT_PER_PAGE: usize = 12;

/// Product list filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    pub active: Option<bool>,
    pub category: Option<String>,
    pub section: Option<String>,
    pub featured: Option<bool>,
    /// Case-insensitive substring of name, SKU, or description.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Filter for what shoppers see in a section.
    #[must_use]
    pub fn active_in_section(code: &str) -> Self {
        Self {
            active: Some(true),
            section: Some(code.to_string()),
            ..Self::default()
        }
    }

    /// The search term, if one is set and non-blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Check a product against every set field.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.active.is_some_and(|active| product.active != active) {
            return false;
        }
        if self.featured.is_some_and(|featured| product.featured != featured) {
            return false;
        }
        if non_empty(self.category.as_deref()).is_some_and(|c| product.category != c) {
            return false;
        }
        if non_empty(self.section.as_deref()).is_some_and(|s| product.section != s) {
            return false;
        }
        self.search_term().is_none_or(|term| {
            let term = term.to_lowercase();
            product.name.to_lowercase().contains(&term)
                || product.sku.as_str().to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Product listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortOrder {
    /// Parse a sort key. Unknown keys fall back to [`SortOrder::Newest`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "name" => Self::Name,
            _ => Self::Newest,
        }
    }

    /// `ORDER BY` clause for the products table.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price_kopecks ASC, id ASC",
            Self::PriceDesc => "price_kopecks DESC, id ASC",
            Self::Name => "name COLLATE NOCASE ASC, id ASC",
        }
    }

    /// Sort products in place. The sort is stable.
    pub fn sort(self, products: &mut [Product]) {
        match self {
            Self::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
            Self::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
            Self::Name => products.sort_by_cached_key(|p| p.name.to_lowercase()),
        }
    }
}

impl FromStr for SortOrder {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// An entry in a pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageLink {
    Number(usize),
    Gap,
}

/// Cut `items` down to one page.
///
/// `per_page` of zero uses [`DEFAULT_PER_PAGE`]. The page number is clamped
/// into `1..=total_pages`, and an empty list still has one (empty) page.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = if per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        per_page
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Links for a pagination bar.
    ///
    /// Shows the first and last pages and the neighbours of the current
    /// page; a page two steps from the current one becomes a gap marker.
    /// A single page has no links.
    #[must_use]
    pub fn window(&self) -> Vec<PageLink> {
        if self.total_pages <= 1 {
            return Vec::new();
        }

        (1..=self.total_pages)
            .filter_map(|i| {
                if i == 1 || i == self.total_pages || i.abs_diff(self.page) <= 1 {
                    Some(PageLink::Number(i))
                } else if i.abs_diff(self.page) == 2 {
                    Some(PageLink::Gap)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// How well a product matched a search query. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchRank {
    Name = 1,
    Sku = 2,
    Other = 3,
}

impl SearchRank {
    /// Rank a product for a lower-cased query, or `None` if it does not match.
    fn of(product: &Product, query: &str) -> Option<Self> {
        if product.name.to_lowercase().contains(query) {
            Some(Self::Name)
        } else if product.sku.as_str().to_lowercase().contains(query) {
            Some(Self::Sku)
        } else if product.description.to_lowercase().contains(query) {
            Some(Self::Other)
        } else {
            None
        }
    }
}

/// Keep the products matching `query` and order them by rank.
///
/// Name matches come first, then SKU matches, then description matches.
/// Products keep their relative order within a rank.
#[must_use]
pub fn rank_search(products: Vec<Product>, query: &str) -> Vec<Product> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(SearchRank, Product)> = products
        .into_iter()
        .filter_map(|product| SearchRank::of(&product, &query).map(|rank| (rank, product)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, product)| product).collect()
}
