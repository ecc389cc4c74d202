//! Order line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The value is outside the accepted range.
    #[error("quantity must be between {min} and {max} (got {got})")]
    OutOfRange {
        /// Minimum accepted quantity.
        min: i32,
        /// Maximum accepted quantity.
        max: i32,
        /// Rejected value.
        got: i64,
    },
    /// The text is not a whole number.
    #[error("quantity must be a whole number (got '{0}')")]
    NotANumber(String),
}

/// Number of units of one product in an order, between 1 and 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Smallest accepted quantity.
    pub const MIN: i32 = 1;
    /// Largest accepted quantity.
    pub const MAX: i32 = 100;

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::OutOfRange`] when `value` is not in 1..=100.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        i32::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(QuantityError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            })
    }

    /// The quantity as an integer.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl std::str::FromStr for Quantity {
    type Err = QuantityError;

    /// Parse a quantity from decimal text such as `"2"` or `" 10 "`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber(s.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
