//! Exact fractions for quorum and threshold checks.
//!
//! Floating point is never used for tallying: every comparison is an integer
//! cross-multiplication, so all replicas reach the same verdict.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fraction `num / den` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRatio")]
pub struct Ratio {
    num: u64,
    den: u64,
}

#[derive(Deserialize)]
struct RawRatio {
    num: u64,
    den: u64,
}

impl Ratio {
    pub const ZERO: Self = Self { num: 0, den: 1 };
    pub const ONE_THIRD: Self = Self { num: 1, den: 3 };
    pub const HALF: Self = Self { num: 1, den: 2 };
    pub const TWO_THIRDS: Self = Self { num: 2, den: 3 };
    pub const ONE: Self = Self { num: 1, den: 1 };

    pub fn new(num: u64, den: u64) -> Result<Self, TypesError> {
        if den == 0 || num > den {
            return Err(TypesError::InvalidRatio { num, den });
        }
        Ok(Self { num, den })
    }

    /// Build a ratio from basis points (10_000 = 100%).
    pub fn from_bps(bps: u32) -> Result<Self, TypesError> {
        Self::new(u64::from(bps), 10_000)
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }

    /// `part > self * whole`.
    pub fn exceeded_by(&self, part: u128, whole: u128) -> bool {
        part.saturating_mul(u128::from(self.den)) > whole.saturating_mul(u128::from(self.num))
    }

    /// `part >= self * whole`.
    pub fn reached_by(&self, part: u128, whole: u128) -> bool {
        part.saturating_mul(u128::from(self.den)) >= whole.saturating_mul(u128::from(self.num))
    }
}

impl TryFrom<RawRatio> for Ratio {
    type Error = TypesError;

    fn try_from(raw: RawRatio) -> Result<Self, Self::Error> {
        Self::new(raw.num, raw.den)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
