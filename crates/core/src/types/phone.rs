//! Customer phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input contains something other than ASCII digits.
    #[error("phone must contain digits only")]
    NonDigit,
    /// The number of digits is outside the accepted range.
    #[error("phone must be {min} to {max} digits (got {got})")]
    BadLength {
        /// Minimum accepted digits.
        min: usize,
        /// Maximum accepted digits.
        max: usize,
        /// Digits supplied.
        got: usize,
    },
}

/// A customer phone number captured at order time.
///
/// ## Constraints
///
/// - 9 or 10 ASCII digits (surrounding whitespace is trimmed)
///
/// ## Examples
///
/// ```
/// use souk_core::Phone;
///
/// assert!(Phone::parse("0550123456").is_ok());
/// assert!(Phone::parse(" 550123456 ").is_ok());
///
/// assert!(Phone::parse("").is_err());
/// assert!(Phone::parse("05501234").is_err());    // too short
/// assert!(Phone::parse("05 50 12 34").is_err()); // inner spaces
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Fewest digits accepted.
    pub const MIN_DIGITS: usize = 9;
    /// Most digits accepted.
    pub const MAX_DIGITS: usize = 10;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, contains non-digits,
    /// or is not 9 to 10 digits long.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::NonDigit);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&s.len()) {
            return Err(PhoneError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
                got: s.len(),
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_phones() {
        assert!(Phone::parse("0550123456").is_ok());
        assert!(Phone::parse("550123456").is_ok());
        assert_eq!(Phone::parse("  0661000000\n").unwrap().as_str(), "0661000000");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(Phone::parse("+213550123"), Err(PhoneError::NonDigit));
        assert_eq!(Phone::parse("0550-12345"), Err(PhoneError::NonDigit));
    }

    #[test]
    fn test_parse_bad_length() {
        assert!(matches!(
            Phone::parse("12345678"),
            Err(PhoneError::BadLength { got: 8, .. })
        ));
        assert!(matches!(
            Phone::parse("12345678901"),
            Err(PhoneError::BadLength { got: 11, .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Phone = serde_json::from_str("\"0550123456\"").unwrap();
        assert_eq!(ok.to_string(), "0550123456");
        assert!(serde_json::from_str::<Phone>("\"abc\"").is_err());
    }
}
