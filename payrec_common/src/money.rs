use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const INR_CURRENCY_CODE: &str = "INR";
pub const INR_CURRENCY_CODE_LOWER: &str = "inr";

const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in minor currency units (paise for INR).
///
/// Payment gateways deal exclusively in integer minor units, so all arithmetic in the reconciliation flows happens on
/// this type. Conversion from major units happens once, at the edge, via [`Money::from_major`].
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor currency units: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let major = self.0 / MINOR_UNITS_PER_MAJOR;
        let minor = (self.0 % MINOR_UNITS_PER_MAJOR).abs();
        write!(f, "₹{major}.{minor:02}")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// A whole number of major units (rupees), e.g. `Money::from_major_units(11)` is ₹11.00.
    pub fn from_major_units(major: i64) -> Self {
        Self(major * MINOR_UNITS_PER_MAJOR)
    }

    /// Converts a fractional major-unit amount to minor units, rounding half-to-even to match the gateway's own
    /// rounding of decimal amounts.
    pub fn from_major(major: f64) -> Result<Self, MoneyConversionError> {
        let minor = major * MINOR_UNITS_PER_MAJOR as f64;
        if !minor.is_finite() || minor.abs() > i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{major} cannot be converted to minor units")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(round_half_to_even(minor)))
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_half_to_even(value: f64) -> i64 {
    let floor = value.floor();
    let frac = value - floor;
    let floor = floor as i64;
    if frac > 0.5 {
        floor + 1
    } else if frac < 0.5 {
        floor
    } else if floor % 2 == 0 {
        floor
    } else {
        floor + 1
    }
}
