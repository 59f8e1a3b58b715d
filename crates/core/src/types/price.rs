//! Type-safe price representation using decimal arithmetic.
//!
//! Prices travel over the wire as plain JSON numbers in the marketplace's
//! single currency (rupees). Numeric strings are accepted on input so that
//! records written by older clients still load.

use core::fmt;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in the marketplace currency.
///
/// ```
/// use agriverse_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(5000, 2)).unwrap();
/// assert_eq!(price.to_string(), "₹50.00");
/// assert!(Price::new(Decimal::NEGATIVE_ONE).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "PriceRepr", into = "PriceRepr")]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest representable price. Arithmetic saturates here.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_units(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a count, e.g. to get a line total. Saturates at
    /// [`Price::MAX`].
    #[must_use]
    pub fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(count)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

/// Saturates at [`Price::MAX`].
impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

/// Wire form: a JSON number (strings accepted on input).
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
struct PriceRepr(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl TryFrom<PriceRepr> for Price {
    type Error = PriceError;

    fn try_from(repr: PriceRepr) -> Result<Self, Self::Error> {
        Self::new(repr.0)
    }
}

impl From<Price> for PriceRepr {
    fn from(price: Price) -> Self {
        Self(price.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rejects_negative() {
        let err = Price::new(Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, PriceError::Negative(_)));
    }

    #[test]
    fn test_price_accepts_zero() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_price_deserializes_from_number_and_string() {
        let from_int: Price = serde_json::from_str("50").unwrap();
        let from_float: Price = serde_json::from_str("12.5").unwrap();
        let from_str: Price = serde_json::from_str("\"12.5\"").unwrap();

        assert_eq!(from_int, Price::from_units(50));
        assert_eq!(from_float.amount(), Decimal::new(125, 1));
        assert_eq!(from_str, from_float);
    }

    #[test]
    fn test_price_deserialize_negative_fails() {
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }

    #[test]
    fn test_price_serializes_as_number() {
        let value = serde_json::to_value(Price::from_units(50)).unwrap();
        assert!(value.is_number());
        assert_eq!(value.as_f64(), Some(50.0));
    }

    #[test]
    fn test_price_times_and_sum() {
        let total: Price = [Price::from_units(50).times(2), Price::from_units(30)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_units(130));
        assert_eq!(total.to_string(), "₹130.00");
    }

    #[test]
    fn test_price_arithmetic_saturates() {
        let huge: Price = serde_json::from_str("5e28").unwrap();
        assert_eq!(huge.times(2), Price::MAX);
        assert_eq!(huge + huge, Price::MAX);
        assert_eq!([huge, huge, Price::from_units(1)].into_iter().sum::<Price>(), Price::MAX);
    }
}
