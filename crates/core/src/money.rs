//! Money amounts held in integer minor units (cents).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A non-negative price in minor currency units (e.g. cents).
///
/// JSON carries prices as decimal numbers (`25.0`); internally and towards the
/// payment processor they are integers (`2500`) so no float ever reaches an
/// amount calculation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Price(u64);

impl Price {
    pub const fn from_minor_units(minor: u64) -> Self {
        Self(minor)
    }

    /// Convert a decimal major-unit amount (`25.00`) into minor units (`2500`),
    /// rounding to the nearest cent.
    pub fn from_major(amount: f64) -> Result<Self, DomainError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::validation(
                "price must be a finite, non-negative number",
            ));
        }
        let minor = (amount * 100.0).round();
        if minor > u64::MAX as f64 {
            return Err(DomainError::validation("price is out of range"));
        }
        Ok(Self(minor as u64))
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub fn as_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl ValueObject for Price {}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_major(amount).map_err(serde::de::Error::custom)
    }
}
