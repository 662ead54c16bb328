//! Stock-keeping unit type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every generated SKU.
pub const GENERATED_PREFIX: &str = "MF";

/// Errors that can occur when parsing a [`Sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    /// The input is empty after trimming.
    #[error("SKU cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("SKU must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A product's unique textual identifier.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-64 characters after trimming
///
/// ## Examples
///
/// ```
/// use ma_furniture_core::Sku;
///
/// assert_eq!(Sku::parse("  MF001 ").unwrap().as_str(), "MF001");
/// assert!(Sku::parse("   ").is_err());
///
/// let generated = Sku::generate("Sofa Grande", 1_700_000_123_456);
/// assert_eq!(generated.as_str(), "MFSOF123456");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    /// Maximum length of a SKU.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Sku` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than 64 characters.
    pub fn parse(s: &str) -> Result<Self, SkuError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(SkuError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(SkuError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a SKU from a product name and a millisecond timestamp.
    ///
    /// The result is `MF`, then the first three latin/cyrillic letters or
    /// digits of the name in upper case, then the last six digits of the
    /// timestamp.
    #[must_use]
    pub fn generate(name: &str, now_millis: i64) -> Self {
        let name_part: String = name
            .to_lowercase()
            .chars()
            .filter(|c| is_sku_char(*c))
            .take(3)
            .collect::<String>()
            .to_uppercase();

        let timestamp = now_millis.unsigned_abs().to_string();
        let tail_start = timestamp
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(index, _)| index);
        let tail = timestamp.get(tail_start..).unwrap_or(&timestamp);

        Self(format!("{GENERATED_PREFIX}{name_part}{tail}"))
    }

    /// Returns the SKU as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Sku` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Characters kept from a product name when generating a SKU.
const fn is_sku_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | 'а'..='я' | 'ё')
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Sku {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self {
        sku.0
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
