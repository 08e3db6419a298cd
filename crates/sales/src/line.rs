use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use orderkit_core::{DomainError, DomainResult, Entity, aggregate_id};
use orderkit_offers::OfferId;
use orderkit_products::{ProductId, VariantId};

use crate::signature::LineSignature;

aggregate_id!(
    /// Order identifier.
    OrderId
);

/// The offer a line's price came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferTag {
    pub offer_id: OfferId,
    pub offer_name: String,
}

impl OfferTag {
    pub fn new(offer_id: OfferId, offer_name: impl Into<String>) -> Self {
        Self {
            offer_id,
            offer_name: offer_name.into(),
        }
    }
}

/// One row of a draft order.
///
/// Prices are in the smallest currency unit. `original_price` is set when the
/// line was converted to a free or discounted line, so the UI can show the
/// price it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: u64,
    #[serde(default)]
    pub original_price: Option<u64>,
    #[serde(default)]
    pub is_free: bool,
    /// Set when an offer priced this line (free or discounted).
    #[serde(default)]
    pub offer: Option<OfferTag>,
    /// Set on trigger-product lines that currently satisfy a buy-get offer.
    #[serde(default)]
    pub trigger_offer_id: Option<OfferId>,
    /// Units of a free/discounted line that were taken from paid lines. The
    /// rest were granted on top of the cart and vanish when the offer shrinks.
    #[serde(default)]
    pub borrowed_qty: u32,
}

impl OrderLine {
    /// A plain paid line.
    pub fn new(line_no: u32, product_id: ProductId, quantity: u32, unit_price: u64) -> Self {
        Self {
            line_no,
            product_id,
            variant_id: None,
            quantity,
            unit_price,
            original_price: None,
            is_free: false,
            offer: None,
            trigger_offer_id: None,
            borrowed_qty: 0,
        }
    }

    pub fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn signature(&self) -> LineSignature {
        LineSignature::of(self)
    }

    pub fn offer_id(&self) -> Option<OfferId> {
        self.offer.as_ref().map(|t| t.offer_id)
    }

    pub fn offer_applied(&self) -> bool {
        self.offer.is_some()
    }

    pub fn is_offer_trigger(&self) -> bool {
        self.trigger_offer_id.is_some()
    }

    /// Paid at the regular price: not free and not priced by an offer.
    pub fn is_normal(&self) -> bool {
        !self.is_free && self.offer.is_none()
    }

    /// Paid line that is either regular or priced by `offer` itself.
    pub fn is_available_to(&self, offer: OfferId) -> bool {
        !self.is_free && self.offer_id().is_none_or(|id| id == offer)
    }

    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

impl Entity for OrderLine {
    type Id = u32;

    fn id(&self) -> &Self::Id {
        &self.line_no
    }
}

/// Next free line number for lines created during a pass.
pub(crate) fn next_line_no(lines: &[OrderLine]) -> u32 {
    lines.iter().map(|l| l.line_no).max().map_or(1, |n| n.saturating_add(1))
}

/// Reject line sets the engine cannot reason about.
pub fn validate_lines(lines: &[OrderLine]) -> DomainResult<()> {
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.line_no) {
            return Err(DomainError::validation(format!(
                "duplicate line number {}",
                line.line_no
            )));
        }
        if line.is_free && line.offer.is_none() {
            return Err(DomainError::validation(format!(
                "line {} is free but names no offer",
                line.line_no
            )));
        }
        if line.is_free && line.unit_price != 0 {
            return Err(DomainError::validation(format!(
                "line {} is free but priced at {}",
                line.line_no, line.unit_price
            )));
        }
        if line.borrowed_qty > line.quantity {
            return Err(DomainError::validation(format!(
                "line {} borrows {} units but holds {}",
                line.line_no, line.borrowed_qty, line.quantity
            )));
        }
    }
    Ok(())
}

/// Cheap structural snapshot of a draft, used to detect superseded passes.
pub fn fingerprint(lines: &[OrderLine]) -> u64 {
    let mut hasher = DefaultHasher::new();
    lines.hash(&mut hasher);
    hasher.finish()
}
