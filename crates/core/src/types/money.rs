//! Exact money representation in integer minor units.
//!
//! All checkout arithmetic happens on [`Cents`]. Decimal major-unit values are
//! derived from it for display and legacy columns only, never the other way
//! around.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Minor units per major unit for every supported currency.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// An amount of money in minor currency units (cents, centimes).
///
/// ```
/// use souk_core::Cents;
///
/// let line = Cents::new(10_000).times(2).unwrap();
/// assert_eq!(line, Cents::new(20_000));
/// assert_eq!(line.to_string(), "200.00");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a raw minor-unit value.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// The raw minor-unit value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiply by a line quantity, returning `None` on overflow.
    #[must_use]
    pub fn times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Clamp negative amounts to zero.
    #[must_use]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 { Self::ZERO } else { self }
    }

    /// Take `percent`% of this amount, rounded half away from zero to a whole
    /// minor unit. Returns `None` if the result does not fit.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use souk_core::Cents;
    ///
    /// assert_eq!(Cents::new(20_000).percentage(Decimal::TEN), Some(Cents::new(2_000)));
    /// assert_eq!(Cents::new(999).percentage(Decimal::new(125, 1)), Some(Cents::new(125)));
    /// ```
    #[must_use]
    pub fn percentage(self, percent: Decimal) -> Option<Self> {
        let raw = Decimal::from(self.0).checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)?;
        let rounded = raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(rounded).ok().map(Self)
    }

    /// Major-unit decimal mirror (e.g. `18500` → `185.00`).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Convert a major-unit decimal into minor units.
    ///
    /// Returns `None` when the value has sub-cent precision or overflows, so
    /// lossy conversions never happen silently.
    #[must_use]
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let scaled = value.checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))?;
        if scaled.fract() != Decimal::ZERO {
            return None;
        }
        i64::try_from(scaled).ok().map(Self)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl From<Cents> for i64 {
    fn from(cents: Cents) -> Self {
        cents.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Cents {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Cents {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let cents = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(cents))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Cents {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    DZD,
    EUR,
    USD,
    MAD,
    TND,
}

impl CurrencyCode {
    /// The ISO code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DZD => "DZD",
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::MAD => "MAD",
            Self::TND => "TND",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DZD" => Ok(Self::DZD),
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            "MAD" => Ok(Self::MAD),
            "TND" => Ok(Self::TND),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_overflow_is_none() {
        assert_eq!(Cents::new(i64::MAX).times(2), None);
        assert_eq!(Cents::new(250).times(4), Some(Cents::new(1_000)));
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 333 * 15% = 49.95 -> 50
        assert_eq!(
            Cents::new(333).percentage(Decimal::new(15, 0)),
            Some(Cents::new(50))
        );
        // 101 * 50% = 50.5 -> 51
        assert_eq!(
            Cents::new(101).percentage(Decimal::new(50, 0)),
            Some(Cents::new(51))
        );
    }

    #[test]
    fn test_decimal_mirror() {
        assert_eq!(Cents::new(18_500).to_decimal(), Decimal::new(18_500, 2));
        assert_eq!(Cents::new(5).to_string(), "0.05");
    }

    #[test]
    fn test_from_decimal_rejects_sub_cent_values() {
        assert_eq!(
            Cents::from_decimal(Decimal::new(12_345, 2)),
            Some(Cents::new(12_345))
        );
        assert_eq!(Cents::from_decimal(Decimal::new(12_345, 3)), None);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Cents::new(-10).non_negative(), Cents::ZERO);
        assert_eq!(Cents::new(10).non_negative(), Cents::new(10));
    }

    #[test]
    fn test_sum() {
        let total: Cents = [Cents::new(100), Cents::new(250)].into_iter().sum();
        assert_eq!(total, Cents::new(350));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("dzd".parse::<CurrencyCode>().unwrap(), CurrencyCode::DZD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
        assert_eq!(CurrencyCode::EUR.to_string(), "EUR");
    }
}
