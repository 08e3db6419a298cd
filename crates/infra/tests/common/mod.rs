#![allow(dead_code)]

use orderkit_offers::{AppliedOffer, BuyGet, Discount, FreeGrant, Offer, OfferId, OfferKind, OracleOutcome, Percent, ProductDiscount};
use orderkit_products::{ProductId, ProductSnapshot, VariantId};

pub fn p(n: u128) -> ProductId {
    ProductId::from_u128(n)
}

pub fn v(n: u128) -> VariantId {
    VariantId::from_u128(1_000 + n)
}

pub fn offer_id(n: u128) -> OfferId {
    OfferId::from_u128(10_000 + n)
}

pub fn product(n: u128, price: u64) -> ProductSnapshot {
    ProductSnapshot::new(p(n), format!("product-{n}"), price)
}

pub fn buy_get(n: u128, linked: u128, buy: u32, target: u128, discount: Discount, per: u32) -> Offer {
    Offer {
        id: offer_id(n),
        name: format!("offer-{n}"),
        active: true,
        kind: OfferKind::BuyGet(BuyGet {
            linked_product_id: p(linked),
            buy_quantity: buy,
            get_product_id: p(target),
            get_discount: discount,
            per_trigger_qty: per,
        }),
    }
}

pub fn percent_off(n: u128, products: &[u128], pct: u32) -> Offer {
    Offer {
        id: offer_id(n),
        name: format!("offer-{n}"),
        active: true,
        kind: OfferKind::ProductDiscount(ProductDiscount {
            affected_product_ids: products.iter().map(|n| p(*n)).collect(),
            discount: Discount::Percentage(Percent::whole(pct).unwrap()),
        }),
    }
}

pub fn applied(n: u128, amount: u64) -> AppliedOffer {
    AppliedOffer {
        offer_id: offer_id(n),
        offer_name: format!("offer-{n}"),
        discount_amount: amount,
    }
}

pub fn outcome(applied_offers: Vec<AppliedOffer>, free_items: Vec<FreeGrant>) -> OracleOutcome {
    let total_discount = applied_offers.iter().map(|a| a.discount_amount).sum();
    OracleOutcome {
        applied_offers,
        free_items,
        total_discount,
    }
}

pub fn free_grant(n: u128, product: u128, quantity: u32) -> FreeGrant {
    FreeGrant {
        offer_id: offer_id(n),
        product_id: p(product),
        quantity,
    }
}
