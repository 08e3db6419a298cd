use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orderkit_products::ProductId;

use crate::offer::OfferId;

/// An offer the oracle matched, with its authoritative discount total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOffer {
    pub offer_id: OfferId,
    pub offer_name: String,
    /// Total discount granted by this offer, in minor units.
    pub discount_amount: u64,
}

/// Free units the oracle grants for a free-type buy-get offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeGrant {
    pub offer_id: OfferId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Result of one batched oracle consultation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleOutcome {
    pub applied_offers: Vec<AppliedOffer>,
    pub free_items: Vec<FreeGrant>,
    pub total_discount: u64,
}

impl OracleOutcome {
    /// "No offers applied"; what an unavailable oracle degrades to.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn applied(&self, offer: OfferId) -> Option<&AppliedOffer> {
        self.applied_offers.iter().find(|a| a.offer_id == offer)
    }

    pub fn is_applied(&self, offer: OfferId) -> bool {
        self.applied(offer).is_some()
    }

    /// Offer is present either as an applied offer or through a free grant.
    pub fn mentions(&self, offer: OfferId) -> bool {
        self.is_applied(offer) || self.free_items.iter().any(|f| f.offer_id == offer)
    }

    /// Positive discount amount reported for `offer`, if any.
    pub fn positive_discount(&self, offer: OfferId) -> Option<u64> {
        self.applied(offer)
            .map(|a| a.discount_amount)
            .filter(|amount| *amount > 0)
    }

    /// Free grants summed per `(offer, product)`, in deterministic order.
    pub fn free_targets(&self) -> BTreeMap<(OfferId, ProductId), u32> {
        let mut targets = BTreeMap::new();
        for grant in &self.free_items {
            *targets.entry((grant.offer_id, grant.product_id)).or_insert(0) += grant.quantity;
        }
        targets
    }
}
