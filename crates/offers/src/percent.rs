use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Serialize};

use orderkit_core::{DomainError, DomainResult, ValueObject};

/// A percentage stored in basis points (1% = 100 bp), capped at 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percent(u32);

impl Percent {
    pub const MAX_BASIS_POINTS: u32 = 10_000;

    pub fn from_basis_points(bp: u32) -> DomainResult<Self> {
        if bp > Self::MAX_BASIS_POINTS {
            return Err(DomainError::validation(format!(
                "percentage {bp}bp exceeds 100%"
            )));
        }
        Ok(Self(bp))
    }

    /// Whole percent, e.g. `Percent::whole(10)` is 10%.
    pub fn whole(pct: u32) -> DomainResult<Self> {
        Self::from_basis_points(pct.saturating_mul(100))
    }

    /// Parse a loosely typed percentage such as `12.5`.
    pub fn from_f64(value: f64) -> DomainResult<Self> {
        let bp = Decimal::from_f64_retain(value)
            .filter(|d| !d.is_sign_negative())
            .and_then(|d| d.checked_mul(Decimal::ONE_HUNDRED))
            .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_u32())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "percentage must be a non-negative number, got {value}"
                ))
            })?;
        if bp > Self::MAX_BASIS_POINTS {
            return Err(DomainError::validation(format!(
                "percentage {value} exceeds 100"
            )));
        }
        Self::from_basis_points(bp)
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    /// The percentage as a fraction, e.g. `0.125` for 12.5%.
    pub fn as_fraction(self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// `amount * (1 - self)`, rounded half up to the nearest minor unit.
    pub fn discounted(self, amount: u64) -> u64 {
        let keep = Decimal::ONE - self.as_fraction();
        Decimal::from_u64(amount)
            .and_then(|amount| amount.checked_mul(keep))
            .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_u64())
            .unwrap_or(0)
    }
}

impl ValueObject for Percent {}

impl TryFrom<u32> for Percent {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_basis_points(value)
    }
}

impl From<Percent> for u32 {
    fn from(value: Percent) -> Self {
        value.0
    }
}
