//! Shopping cart rules.
//!
//! A cart is an ordered list of line items, one per product. Each line keeps
//! a snapshot of the product's name, price, and image taken when it was
//! first added, so the cart renders without a catalog lookup.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// Largest quantity of one product in a cart.
pub const MAX_QUANTITY: u32 = 99;

/// Most line items kept when a cart is persisted.
pub const MAX_LINES: usize = 50;

/// Longest image URL kept when a cart is persisted.
pub const MAX_IMAGE_LEN: usize = 100;

/// Product details copied into a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.main_image().map(ToString::to_string),
        }
    }
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    /// Always in `1..=99`.
    pub quantity: u32,
}

impl CartLine {
    /// Price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Something the shopper should be told about after a cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartNotice {
    /// The quantity hit the per-product limit.
    QuantityCapped,
    /// Lines beyond the persisted limit were dropped.
    Truncated,
}

impl CartNotice {
    /// Shopper-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::QuantityCapped => "Максимальное количество товара - 99 шт.",
            Self::Truncated => "Корзина ограничена 50 товарами",
        }
    }
}

/// A shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    /// Add one unit of a product.
    ///
    /// An existing line is incremented instead of duplicated. Returns
    /// [`CartNotice::QuantityCapped`] if the line was already at the limit.
    pub fn add(&mut self, snapshot: ProductSnapshot) -> Option<CartNotice> {
        if let Some(line) = self.line_mut(snapshot.product_id) {
            if line.quantity >= MAX_QUANTITY {
                line.quantity = MAX_QUANTITY;
                return Some(CartNotice::QuantityCapped);
            }
            line.quantity += 1;
            return None;
        }

        self.lines.push(CartLine {
            product_id: snapshot.product_id,
            name: snapshot.name,
            price: snapshot.price,
            image: snapshot.image,
            quantity: 1,
        });
        None
    }

    /// Change a line's quantity by `delta`.
    ///
    /// The line is removed if the quantity drops below 1 and clamped to 99
    /// if it would exceed it. Unknown products are ignored.
    pub fn change_quantity(&mut self, product_id: ProductId, delta: i64) -> Option<CartNotice> {
        let line = self.line_mut(product_id)?;
        let next = i64::from(line.quantity).saturating_add(delta);

        if next < 1 {
            self.remove(product_id);
            return None;
        }

        match u32::try_from(next) {
            Ok(quantity) if quantity <= MAX_QUANTITY => {
                line.quantity = quantity;
                None
            }
            _ => {
                line.quantity = MAX_QUANTITY;
                Some(CartNotice::QuantityCapped)
            }
        }
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Quantity of a product in the cart, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Shrink the cart to its persisted form.
    ///
    /// Keeps the first 50 lines and truncates image URLs to 100 characters.
    /// Returns [`CartNotice::Truncated`] if lines were dropped.
    pub fn compact(&mut self) -> Option<CartNotice> {
        for image in self.lines.iter_mut().filter_map(|l| l.image.as_mut()) {
            let cut = image.char_indices().nth(MAX_IMAGE_LEN).map(|(i, _)| i);
            if let Some(cut) = cut {
                image.truncate(cut);
            }
        }

        if self.lines.len() > MAX_LINES {
            self.lines.truncate(MAX_LINES);
            return Some(CartNotice::Truncated);
        }
        None
    }

    /// Load a stored cart. Corrupted data yields an empty cart.
    #[must_use]
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Self>(raw) {
            Ok(mut cart) => {
                cart.lines.retain(|l| l.quantity >= 1);
                for line in &mut cart.lines {
                    line.quantity = line.quantity.min(MAX_QUANTITY);
                }
                cart
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupted cart data");
                Self::new()
            }
        }
    }

    /// Serialize the cart for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
