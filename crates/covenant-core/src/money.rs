//! # Monetary Amounts
//!
//! Amounts are integer minor units (cents, fils, satoshi). Floats never
//! appear in an amount, which keeps canonical bytes deterministic.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A monetary amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw minor-unit value. Zero is allowed (e.g. a fee-less request).
    pub fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    /// Wrap a value that must be strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveAmount`] for zero.
    pub fn positive(minor_units: u64) -> Result<Self, ValidationError> {
        if minor_units == 0 {
            return Err(ValidationError::NonPositiveAmount(minor_units));
        }
        Ok(Self(minor_units))
    }

    /// The raw minor-unit value.
    pub fn minor_units(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Reject zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveAmount`] for zero.
    pub fn ensure_positive(self) -> Result<Self, ValidationError> {
        Self::positive(self.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
