//! Shared builders for unit tests.

use orderkit_offers::{BuyGet, Discount, Offer, OfferId, OfferKind, Percent, ProductDiscount};
use orderkit_products::{CatalogSnapshot, ProductId, ProductSnapshot, VariantId};

use crate::line::{OfferTag, OrderLine};

pub fn p(n: u128) -> ProductId {
    ProductId::from_u128(n)
}

pub fn v(n: u128) -> VariantId {
    VariantId::from_u128(1_000 + n)
}

pub fn offer_id(n: u128) -> OfferId {
    OfferId::from_u128(10_000 + n)
}

pub fn offer_tag(n: u128) -> OfferTag {
    OfferTag::new(offer_id(n), format!("offer-{n}"))
}

pub fn free_line(line_no: u32, product: ProductId, quantity: u32, tag: OfferTag) -> OrderLine {
    let mut line = OrderLine::new(line_no, product, quantity, 0);
    line.is_free = true;
    line.offer = Some(tag);
    line
}

pub fn discounted_line(
    line_no: u32,
    product: ProductId,
    quantity: u32,
    unit_price: u64,
    tag: OfferTag,
) -> OrderLine {
    let mut line = OrderLine::new(line_no, product, quantity, unit_price);
    line.offer = Some(tag);
    line.borrowed_qty = quantity;
    line
}

pub fn product(n: u128, price: u64) -> ProductSnapshot {
    ProductSnapshot::new(p(n), format!("product-{n}"), price)
}

pub fn catalog(products: impl IntoIterator<Item = ProductSnapshot>) -> CatalogSnapshot {
    products.into_iter().collect()
}

pub fn buy_get_offer(n: u128, linked: u128, buy: u32, target: u128, discount: Discount, per: u32) -> Offer {
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

pub fn product_discount_offer(n: u128, products: &[u128], pct: u32) -> Offer {
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

pub fn qty_of(lines: &[OrderLine], product: ProductId) -> u32 {
    lines.iter().filter(|l| l.product_id == product).map(|l| l.quantity).sum()
}

pub fn empty_catalog() -> CatalogSnapshot {
    CatalogSnapshot::new()
}
