//! Merchandising sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SectionId;

/// A merchandising grouping of products, referenced from products by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub code: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
