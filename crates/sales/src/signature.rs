use serde::{Deserialize, Serialize};

use orderkit_core::ValueObject;
use orderkit_offers::OfferId;
use orderkit_products::{ProductId, VariantId};

use crate::line::OrderLine;

/// Merge key of a draft line.
///
/// Two lines with the same signature describe the same thing to the customer
/// and are collapsed into one by the partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineSignature {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub is_free: bool,
    pub offer_id: Option<OfferId>,
    pub trigger_offer_id: Option<OfferId>,
}

impl LineSignature {
    pub fn of(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            variant_id: line.variant_id,
            is_free: line.is_free,
            offer_id: line.offer_id(),
            trigger_offer_id: line.trigger_offer_id,
        }
    }
}

impl ValueObject for LineSignature {}
