use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

/// Number of decimal places carried by [`Money`].
pub const MONEY_SCALE: u32 = 2;

/// The largest difference between a provider-reported amount and an order total that is still considered a match.
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, MONEY_SCALE);

//--------------------------------------        Money        ---------------------------------------------------------
/// A fixed-point currency value, stored as an integer number of minor units (e.g. pesewas or cents).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub fn from_minor_units(value: i64) -> Self {
        Self(value)
    }

    pub fn from_major_units(value: i64) -> Self {
        Self(value * 100)
    }

    /// The value in minor units
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Converts a decimal value into `Money`. Values with more than two decimal places of precision are rejected
    /// rather than rounded.
    pub fn try_from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        let scaled = value
            .checked_mul(Decimal::from(100))
            .ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))?;
        if scaled.fract() != Decimal::ZERO {
            return Err(MoneyConversionError(format!("{value} has more than {MONEY_SCALE} decimal places")));
        }
        let minor = i64::try_from(scaled).map_err(|e| MoneyConversionError(format!("{value}: {e}")))?;
        Ok(Self(minor))
    }

    /// Returns true if `reported` differs from this amount by no more than [`AMOUNT_TOLERANCE`].
    /// A difference too large to represent is a mismatch.
    pub fn matches_within_tolerance(&self, reported: Decimal) -> bool {
        reported.checked_sub(self.to_decimal()).is_some_and(|diff| diff.abs() <= AMOUNT_TOLERANCE)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Self::try_from_decimal(value)
    }
}

// Serialized as a decimal string ("150.00") so that downstream consumers never see raw minor units.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::try_from_decimal(value).map_err(serde::de::Error::custom)
    }
}
