//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored in the database as integer kopecks so that sorting and
//! aggregation happen on exact values, and are exposed over JSON as plain
//! numbers in roubles (`15000`, `4999.9`).

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input is not a number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// The amount does not fit in the storage representation.
    #[error("price is out of range")]
    OutOfRange,
}

/// ISO 4217 currency codes the catalog can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    RUB,
}

impl CurrencyCode {
    /// Display symbol placed after the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::RUB => "₽",
        }
    }
}

/// A non-negative catalog price in roubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero roubles.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount < 0`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount.round_dp(2).normalize()))
    }

    /// Parse a price typed by an admin: `15000`, `15 000`, `4999.90`, `4999,90`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for non-numeric input and
    /// `PriceError::Negative` for amounts below zero.
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();

        if cleaned.is_empty() {
            return Err(PriceError::Invalid(raw.to_string()));
        }

        let amount =
            Decimal::from_str(&cleaned).map_err(|_| PriceError::Invalid(raw.to_string()))?;
        Self::new(amount)
    }

    /// Build a price from integer kopecks.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `kopecks < 0`.
    pub fn from_kopecks(kopecks: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(kopecks, 2))
    }

    /// Amount in kopecks, as stored in the database.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` if the amount exceeds `i64` kopecks.
    pub fn to_kopecks(self) -> Result<i64, PriceError> {
        (self.0 * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or(PriceError::OutOfRange)
    }

    /// Amount in roubles.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format in the Russian locale as whole roubles: `15 000 ₽`.
    ///
    /// Thousands are grouped with a non-breaking space.
    #[must_use]
    pub fn display(self) -> String {
        let whole = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string();

        let digits: Vec<char> = whole.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (index, digit) in digits.iter().enumerate() {
            if index > 0 && (digits.len() - index) % 3 == 0 {
                grouped.push('\u{a0}');
            }
            grouped.push(*digit);
        }

        format!("{grouped}\u{a0}{}", CurrencyCode::RUB.symbol())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|price| price.0).sum())
    }
}

/// Whole amounts serialize as integers (`45000`), others as floats (`4999.9`).
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.fract().is_zero().then(|| self.0.to_i64()).flatten() {
            Some(whole) => serializer.serialize_i64(whole),
            None => rust_decimal::serde::float::serialize(&self.0, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Decimal::try_from(value)
                .map_err(|_| PriceError::Invalid(value.to_string()))
                .and_then(Self::new)
                .map_err(serde::de::Error::custom),
            Raw::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}
