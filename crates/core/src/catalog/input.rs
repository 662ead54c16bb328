//! Validation of product and section writes.
//!
//! Inputs arrive from multipart forms, JSON bodies, import files, and YAML
//! seed files, so every field is optional and accepts loosely typed values
//! (`"15000"` or `15000`, `"true"` or `true`). Validation turns an input into
//! a record that is ready to be written.

use serde::Deserialize;

use super::{Product, Specifications};
use crate::types::{Price, Sku};

pub const PRODUCT_NAME_REQUIRED: &str = "Product name is required";
pub const PRICE_REQUIRED: &str = "Valid price is required";
pub const CATEGORY_REQUIRED: &str = "Category is required";
pub const SECTION_FIELDS_REQUIRED: &str = "Name and code are required";

/// One or more validation failures.
///
/// Displays as all messages joined by `", "`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .0.join(", "))]
pub struct ValidationError(pub Vec<String>);

impl ValidationError {
    /// A single-message error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// The individual messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// Interpret a form flag: `true`, `on`, `1`, `yes` (any case) are true.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// Fields accepted when creating or updating a product.
///
/// Absent fields are `None`. On update an absent field keeps the current
/// value; on create it takes the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "loose::string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub stock: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::features")]
    pub features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "loose::specifications")]
    pub specifications: Option<Specifications>,
    #[serde(default, deserialize_with = "loose::string")]
    pub badge: Option<String>,
    #[serde(default, deserialize_with = "loose::flag")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "loose::flag")]
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "loose::features")]
    pub images: Option<Vec<String>>,
}

/// A validated product, ready to insert or to overwrite an existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub sku: Sku,
    pub name: String,
    pub price: Price,
    pub category: String,
    pub section: String,
    /// Units in stock, zero when the input gives none.
    pub stock: i64,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: Specifications,
    pub badge: String,
    pub active: bool,
    pub featured: bool,
    pub images: Vec<String>,
}

impl ProductRecord {
    /// A product outside any section cannot be active.
    fn enforce_section_rule(mut self) -> Self {
        if self.section.is_empty() {
            self.active = false;
        }
        self
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_positive_price(raw: &str) -> Option<Price> {
    Price::parse(raw).ok().filter(|price| *price > Price::ZERO)
}

fn parse_stock(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

impl ProductInput {
    /// Validate a new product.
    ///
    /// The SKU is generated from the name and `now_millis` when absent.
    /// Products are active unless the input says otherwise, and never active
    /// without a section.
    ///
    /// # Errors
    ///
    /// Returns every failed rule at once: missing name, missing or
    /// non-positive price, missing category, or a malformed SKU.
    pub fn into_record(self, now_millis: i64) -> Result<ProductRecord, ValidationError> {
        let mut errors = Vec::new();

        let name = non_blank(self.name.as_ref());
        if name.is_none() {
            errors.push(PRODUCT_NAME_REQUIRED.to_string());
        }

        let price = self.price.as_deref().and_then(parse_positive_price);
        if price.is_none() {
            errors.push(PRICE_REQUIRED.to_string());
        }

        let category = non_blank(self.category.as_ref());
        if category.is_none() {
            errors.push(CATEGORY_REQUIRED.to_string());
        }

        let sku = match non_blank(self.sku.as_ref()) {
            Some(raw) => match Sku::parse(&raw) {
                Ok(sku) => Some(sku),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            },
            None => name
                .as_deref()
                .map(|name| Sku::generate(name, now_millis)),
        };

        let (Some(name), Some(price), Some(category), Some(sku), true) =
            (name, price, category, sku, errors.is_empty())
        else {
            return Err(ValidationError(errors));
        };

        Ok(ProductRecord {
            sku,
            name,
            price,
            category,
            section: self.section.map(|s| s.trim().to_string()).unwrap_or_default(),
            stock: parse_stock(self.stock.as_deref()).unwrap_or(0),
            description: self.description.unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            specifications: self.specifications.unwrap_or_default(),
            badge: self.badge.unwrap_or_default(),
            active: self.active.unwrap_or(true),
            featured: self.featured.unwrap_or(false),
            images: self.images.unwrap_or_default(),
        }
        .enforce_section_rule())
    }

    /// Validate an update against the current product.
    ///
    /// Absent fields keep their current values, as do a blank name, category,
    /// SKU, price, or stock. A section that is present but blank removes the
    /// product from its section, which also deactivates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a price is given but is not a positive number, or
    /// if a given SKU is malformed.
    pub fn merge(self, current: &Product) -> Result<ProductRecord, ValidationError> {
        let mut errors = Vec::new();

        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => current.price,
            Some(raw) => parse_positive_price(raw).unwrap_or_else(|| {
                errors.push(PRICE_REQUIRED.to_string());
                current.price
            }),
        };

        let sku = match non_blank(self.sku.as_ref()) {
            None => current.sku.clone(),
            Some(raw) => Sku::parse(&raw).unwrap_or_else(|e| {
                errors.push(e.to_string());
                current.sku.clone()
            }),
        };

        if !errors.is_empty() {
            return Err(ValidationError(errors));
        }

        let section = self
            .section
            .map_or_else(|| current.section.clone(), |s| s.trim().to_string());

        Ok(ProductRecord {
            sku,
            name: non_blank(self.name.as_ref()).unwrap_or_else(|| current.name.clone()),
            price,
            category: non_blank(self.category.as_ref())
                .unwrap_or_else(|| current.category.clone()),
            section,
            stock: parse_stock(self.stock.as_deref()).unwrap_or(current.stock),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            features: self.features.unwrap_or_else(|| current.features.clone()),
            specifications: self
                .specifications
                .unwrap_or_else(|| current.specifications.clone()),
            badge: self.badge.unwrap_or_else(|| current.badge.clone()),
            active: self.active.unwrap_or(current.active),
            featured: self.featured.unwrap_or(current.featured),
            images: self.images.unwrap_or_else(|| current.images.clone()),
        }
        .enforce_section_rule())
    }
}

/// Fields accepted when creating or updating a section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionInput {
    #[serde(default, deserialize_with = "loose::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "loose::flag")]
    pub active: Option<bool>,
}

/// A validated section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub name: String,
    pub code: String,
    pub active: bool,
}

impl SectionInput {
    /// Validate a section. Sections are active unless the input says otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or code is missing.
    pub fn into_record(self) -> Result<SectionRecord, ValidationError> {
        match (non_blank(self.name.as_ref()), non_blank(self.code.as_ref())) {
            (Some(name), Some(code)) => Ok(SectionRecord {
                name,
                code,
                active: self.active.unwrap_or(true),
            }),
            _ => Err(ValidationError::new(SECTION_FIELDS_REQUIRED)),
        }
    }
}

/// Deserializers that accept the loosely typed values browsers and
/// hand-written files produce.
mod loose {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::super::{Specifications, parse_features, parse_specifications};
    use super::parse_flag;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => Some(parse_flag(&s)),
            Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
            _ => None,
        })
    }

    /// A list of strings, or a newline-separated text block.
    pub fn features<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Some(Value::String(text)) => Some(parse_features(&text)),
            _ => None,
        })
    }

    /// An object, a JSON-encoded object, or `key: value` lines.
    pub fn specifications<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Specifications>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Object(map)) => Some(map),
            Some(Value::String(text)) => Some(
                serde_json::from_str::<Specifications>(&text)
                    .unwrap_or_else(|_| parse_specifications(&text)),
            ),
            _ => None,
        })
    }
}
