use serde::{Deserialize, Serialize};

use orderkit_core::{Entity, aggregate_id};
use orderkit_products::ProductId;

use crate::percent::Percent;

aggregate_id!(
    /// Offer identifier.
    OfferId
);

/// How a discount changes a unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Unit price becomes zero.
    Free,
    Percentage(Percent),
    /// Amount off per unit, in minor currency units.
    Fixed(u64),
}

impl Discount {
    pub fn is_free(&self) -> bool {
        matches!(self, Discount::Free)
    }
}

/// Buy `buy_quantity` of the linked product, get `per_trigger_qty` of the
/// target product discounted, once per full multiple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyGet {
    pub linked_product_id: ProductId,
    pub buy_quantity: u32,
    pub get_product_id: ProductId,
    pub get_discount: Discount,
    pub per_trigger_qty: u32,
}

impl BuyGet {
    /// Number of complete triggers for a trigger-product quantity.
    pub fn times(&self, trigger_qty: u32) -> u32 {
        trigger_qty.checked_div(self.buy_quantity).unwrap_or(0)
    }

    /// Target units granted for a trigger-product quantity.
    pub fn granted_qty(&self, trigger_qty: u32) -> u32 {
        self.times(trigger_qty).saturating_mul(self.per_trigger_qty)
    }
}

/// Discount on a fixed set of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDiscount {
    pub affected_product_ids: Vec<ProductId>,
    pub discount: Discount,
}

/// Store-wide discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularDiscount {
    pub discount: Discount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferKind {
    BuyGet(BuyGet),
    ProductDiscount(ProductDiscount),
    RegularDiscount(RegularDiscount),
}

/// A validated promotional offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    pub active: bool,
    pub kind: OfferKind,
}

impl Offer {
    pub fn buy_get(&self) -> Option<&BuyGet> {
        match &self.kind {
            OfferKind::BuyGet(b) => Some(b),
            _ => None,
        }
    }

    /// Buy-get offer that hands out free units.
    pub fn free_buy_get(&self) -> Option<&BuyGet> {
        self.buy_get().filter(|b| b.get_discount.is_free())
    }

    /// Buy-get offer that discounts (but does not zero) target units.
    pub fn value_buy_get(&self) -> Option<&BuyGet> {
        self.buy_get().filter(|b| !b.get_discount.is_free())
    }

    /// Flat discount (`ProductDiscount` / `RegularDiscount`).
    pub fn flat_discount(&self) -> Option<Discount> {
        match &self.kind {
            OfferKind::ProductDiscount(p) => Some(p.discount),
            OfferKind::RegularDiscount(r) => Some(r.discount),
            OfferKind::BuyGet(_) => None,
        }
    }

    /// Whether a flat discount covers `product`. Buy-get offers never do.
    pub fn flat_discount_covers(&self, product: ProductId) -> bool {
        match &self.kind {
            OfferKind::ProductDiscount(p) => p.affected_product_ids.contains(&product),
            OfferKind::RegularDiscount(_) => true,
            OfferKind::BuyGet(_) => false,
        }
    }
}

impl Entity for Offer {
    type Id = OfferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
