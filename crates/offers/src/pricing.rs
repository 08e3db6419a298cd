//! Unit-price arithmetic for discounted lines.
//!
//! Resolution order for a discounted unit price:
//! 1. a forced price derived from the oracle's authoritative discount total,
//! 2. a one-unit trial through the offer-application collaborator,
//! 3. the discount formula applied to the original price.

use serde::{Deserialize, Serialize};

use crate::offer::Discount;

/// Outcome of a one-unit trial application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPrice {
    Priced(u64),
    /// The collaborator could not price the unit; use the formula.
    Fallback,
}

/// Discount formula: `percentage → original * (1 - value)`,
/// `fixed → max(0, original - value)`, `free → 0`.
pub fn apply_discount(original: u64, discount: &Discount) -> u64 {
    match discount {
        Discount::Free => 0,
        Discount::Percentage(pct) => pct.discounted(original),
        Discount::Fixed(amount) => original.saturating_sub(*amount),
    }
}

/// `original - discount_amount / expected_qty`, with the per-unit share
/// rounded half up. `None` when there is nothing to spread the amount over.
pub fn forced_unit_price(original: u64, discount_amount: u64, expected_qty: u32) -> Option<u64> {
    if expected_qty == 0 || discount_amount == 0 {
        return None;
    }
    let qty = u64::from(expected_qty);
    let per_unit = (discount_amount + qty / 2) / qty;
    Some(original.saturating_sub(per_unit))
}

pub fn resolve_unit_price(
    forced: Option<u64>,
    trial: TrialPrice,
    discount: &Discount,
    original: u64,
) -> u64 {
    if let Some(price) = forced {
        return price;
    }
    match trial {
        TrialPrice::Priced(price) => price,
        TrialPrice::Fallback => apply_discount(original, discount),
    }
}
