//! Normalized promotional code strings.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PromoCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromoCodeError {
    #[error("promo code cannot be empty")]
    Empty,
    #[error("promo code must be at most {max} characters")]
    TooLong { max: usize },
    #[error("promo code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// A promotional code, trimmed and upper-cased so lookups are
/// case-insensitive.
///
/// ```
/// use souk_core::PromoCode;
///
/// let code = PromoCode::parse(" save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// assert_eq!(code, PromoCode::parse("SAVE10").unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PromoCode(String);

impl PromoCode {
    /// Maximum code length.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, PromoCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PromoCodeError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(PromoCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PromoCodeError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PromoCode {
    type Error = PromoCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PromoCode> for String {
    fn from(code: PromoCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for PromoCode {
    type Err = PromoCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
