//! Product pricing using decimal arithmetic.
//!
//! Operators only ever set the discounted price. The list price is derived
//! from it by convention: `price = 2 × discounted price`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Pricing`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("not a valid price: {0}")]
    Invalid(String),
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// Doubling the input does not fit in a decimal.
    #[error("price is too large")]
    Overflow,
}

/// The pair of prices stored on every product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// List price, always twice the discounted price.
    pub price: Decimal,
    /// Price the operator asked for.
    pub discounted_price: Decimal,
}

impl Pricing {
    /// Derive both prices from the operator's discounted price.
    ///
    /// Values are normalized (`21.0` becomes `21`) so that integer and
    /// numeric price columns accept them alike.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is negative or too large to double.
    pub fn from_discounted(discounted_price: Decimal) -> Result<Self, PriceError> {
        if discounted_price.is_sign_negative() && !discounted_price.is_zero() {
            return Err(PriceError::Negative);
        }

        let price = discounted_price
            .checked_mul(Decimal::TWO)
            .ok_or(PriceError::Overflow)?;

        Ok(Self {
            price: price.normalize(),
            discounted_price: discounted_price.normalize(),
        })
    }

    /// Parse the operator's discounted price from a command argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a non-negative decimal number.
    pub fn parse_discounted(s: &str) -> Result<Self, PriceError> {
        let value = Decimal::from_str(s).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::from_discounted(value)
    }
}
