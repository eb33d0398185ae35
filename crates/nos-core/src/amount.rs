//! NOS token amount type with fixed-point precision.
//!
//! NOS carries 6 decimal places. Amounts are stored in base units
//! (10^-6 NOS) and all arithmetic is checked.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Number of decimal places for NOS precision.
pub const DECIMALS: u32 = 6;

/// One whole NOS in base units.
pub const UNITS_PER_NOS: u64 = 1_000_000;

/// A NOS token amount in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(0);

    /// Maximum possible amount.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an amount from base units.
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Creates an amount from whole NOS.
    #[must_use]
    pub const fn from_nos(nos: u64) -> Self {
        Self(nos * UNITS_PER_NOS)
    }

    /// Returns the amount in base units.
    #[must_use]
    pub const fn as_units(self) -> u64 {
        self.0
    }

    /// Returns the amount in whole NOS (truncates fractional part).
    #[must_use]
    pub const fn as_nos(self) -> u64 {
        self.0 / UNITS_PER_NOS
    }

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by a scalar. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, rhs: u64) -> Option<Self> {
        match self.0.checked_mul(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked division by a scalar. Returns `None` if divisor is zero.
    #[must_use]
    pub const fn checked_div(self, rhs: u64) -> Option<Self> {
        match self.0.checked_div(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_NOS;
        let frac = self.0 % UNITS_PER_NOS;
        write!(f, "{whole}.{frac:06} NOS")
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('-') {
            return Err(CoreError::InvalidAmount("negative values not allowed".into()));
        }

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if frac_str.contains('.') {
            return Err(CoreError::InvalidAmount(format!("invalid format: {s}")));
        }
        if frac_str.len() > DECIMALS as usize {
            return Err(CoreError::InvalidAmount("too many decimal places".into()));
        }

        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse()
                .map_err(|_| CoreError::InvalidAmount(format!("invalid whole part: {s}")))?
        };

        let frac: u64 = if frac_str.is_empty() {
            0
        } else {
            format!("{frac_str:0<6}")
                .parse()
                .map_err(|_| CoreError::InvalidAmount(format!("invalid fractional part: {s}")))?
        };

        whole
            .checked_mul(UNITS_PER_NOS)
            .and_then(|units| units.checked_add(frac))
            .map(Amount)
            .ok_or_else(|| CoreError::InvalidAmount("overflow".into()))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Decimal string without trailing zeros
        let whole = self.0 / UNITS_PER_NOS;
        let frac = self.0 % UNITS_PER_NOS;

        let s = if frac == 0 {
            format!("{whole}")
        } else {
            let frac_str = format!("{frac:06}");
            format!("{whole}.{}", frac_str.trim_end_matches('0'))
        };

        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
