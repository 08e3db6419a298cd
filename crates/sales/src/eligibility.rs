//! Buy-get eligibility for a single product.

use serde::{Deserialize, Serialize};

use orderkit_offers::{Offer, OfferId};
use orderkit_products::{ProductId, ProductLookup, UserTier};

use crate::line::OrderLine;

/// Whether a buy-get offer linked to a product qualifies for the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub offer_id: OfferId,
    pub offer_name: String,
    pub current_qty: u32,
    pub buy_quantity: u32,
    /// Complete triggers in `current_qty`.
    pub times: u32,
    /// Target units the triggers would grant.
    pub grant_qty: u32,
    pub target_product_id: ProductId,
    pub target_unit_price: Option<u64>,
    pub eligible: bool,
    pub can_apply: bool,
}

/// Paid quantity of `product` that counts towards `offer`: non-free lines that
/// are regular or already priced by this same offer.
pub fn qualifying_quantity(lines: &[OrderLine], product: ProductId, offer: OfferId) -> u32 {
    lines
        .iter()
        .filter(|l| l.product_id == product && l.is_available_to(offer))
        .map(|l| l.quantity)
        .sum()
}

/// Evaluate the buy-get offers linked to `product`.
///
/// `quantity` is the product's quantity as the caller sees it; it is used only
/// while the draft has no qualifying line for the product yet (the product is
/// being added). Among several linked offers the first applicable one (by
/// offer id) wins, then the first eligible one. Returns `None` when no active
/// buy-get offer is linked to the product or none is eligible.
pub fn evaluate_buy_get(
    product: ProductId,
    quantity: u32,
    lines: &[OrderLine],
    offers: &[Offer],
    catalog: &impl ProductLookup,
    tier: UserTier,
) -> Option<Eligibility> {
    let has_lines = lines.iter().any(|l| l.product_id == product && !l.is_free);

    let mut linked: Vec<&Offer> = offers
        .iter()
        .filter(|o| o.active)
        .filter(|o| o.buy_get().is_some_and(|b| b.linked_product_id == product))
        .collect();
    linked.sort_by_key(|o| o.id);

    let descriptors = linked.into_iter().filter_map(|offer| {
        let bg = offer.buy_get()?;
        let current_qty = if has_lines {
            qualifying_quantity(lines, product, offer.id)
        } else {
            quantity
        };
        let eligible = current_qty >= bg.buy_quantity;

        let target = bg.get_product_id;
        let already_applied = lines
            .iter()
            .any(|l| l.product_id == target && l.offer_id() == Some(offer.id));
        let target_available = bg.get_discount.is_free()
            || lines
                .iter()
                .any(|l| l.product_id == target && l.is_normal() && l.quantity > 0);

        Some(Eligibility {
            offer_id: offer.id,
            offer_name: offer.name.clone(),
            current_qty,
            buy_quantity: bg.buy_quantity,
            times: bg.times(current_qty),
            grant_qty: bg.granted_qty(current_qty),
            target_product_id: target,
            target_unit_price: catalog.product(target).map(|p| p.display_price(tier)),
            eligible,
            can_apply: eligible && !already_applied && target_available,
        })
    });

    let mut first_eligible = None;
    for descriptor in descriptors {
        if descriptor.can_apply {
            return Some(descriptor);
        }
        if descriptor.eligible && first_eligible.is_none() {
            first_eligible = Some(descriptor);
        }
    }
    first_eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use orderkit_offers::{Discount, Percent};

    fn b3g1_free() -> Offer {
        buy_get_offer(1, 1, 3, 2, Discount::Free, 1)
    }

    #[test]
    fn below_buy_quantity_is_not_eligible() {
        let lines = vec![OrderLine::new(1, p(1), 2, 100)];
        let result = evaluate_buy_get(p(1), 2, &lines, &[b3g1_free()], &empty_catalog(), UserTier::Retail);
        assert_eq!(result, None);
    }

    #[test]
    fn free_offer_applies_without_target_in_cart() {
        let lines = vec![OrderLine::new(1, p(1), 3, 100)];
        let cat = catalog([product(2, 40)]);
        let result = evaluate_buy_get(p(1), 3, &lines, &[b3g1_free()], &cat, UserTier::Retail).unwrap();

        assert!(result.eligible);
        assert!(result.can_apply);
        assert_eq!(result.times, 1);
        assert_eq!(result.grant_qty, 1);
        assert_eq!(result.target_unit_price, Some(40));
    }

    #[test]
    fn existing_free_line_blocks_reapplication() {
        let offer = b3g1_free();
        let lines = vec![
            OrderLine::new(1, p(1), 3, 100),
            free_line(2, p(2), 1, offer_tag(1)),
        ];
        let result = evaluate_buy_get(p(1), 3, &lines, &[offer], &empty_catalog(), UserTier::Retail).unwrap();
        assert!(result.eligible);
        assert!(!result.can_apply);
    }

    #[test]
    fn value_offer_needs_target_in_cart() {
        let half_off = buy_get_offer(1, 1, 2, 2, Discount::Percentage(Percent::whole(50).unwrap()), 1);
        let without_target = vec![OrderLine::new(1, p(1), 2, 100)];
        let r = evaluate_buy_get(p(1), 2, &without_target, &[half_off.clone()], &empty_catalog(), UserTier::Retail)
            .unwrap();
        assert!(r.eligible && !r.can_apply);

        let with_target = vec![OrderLine::new(1, p(1), 2, 100), OrderLine::new(2, p(2), 1, 60)];
        let r = evaluate_buy_get(p(1), 2, &with_target, &[half_off], &empty_catalog(), UserTier::Retail).unwrap();
        assert!(r.can_apply);
    }

    #[test]
    fn lines_priced_by_other_offers_do_not_count() {
        let lines = vec![
            OrderLine::new(1, p(1), 2, 100),
            discounted_line(2, p(1), 5, 90, offer_tag(7)),
        ];
        let r = evaluate_buy_get(p(1), 7, &lines, &[b3g1_free()], &empty_catalog(), UserTier::Retail);
        assert_eq!(r, None);
    }

    #[test]
    fn explicit_quantity_is_used_for_a_product_being_added() {
        let r = evaluate_buy_get(p(1), 3, &[], &[b3g1_free()], &empty_catalog(), UserTier::Retail).unwrap();
        assert_eq!(r.current_qty, 3);
        assert!(r.eligible);
    }

    #[test]
    fn inactive_offers_are_ignored() {
        let mut offer = b3g1_free();
        offer.active = false;
        let lines = vec![OrderLine::new(1, p(1), 3, 100)];
        assert_eq!(evaluate_buy_get(p(1), 3, &lines, &[offer], &empty_catalog(), UserTier::Retail), None);
    }

    #[test]
    fn applicable_offer_beats_merely_eligible_one() {
        let blocked = b3g1_free();
        let open = buy_get_offer(2, 1, 3, 3, Discount::Free, 1);
        let lines = vec![
            OrderLine::new(1, p(1), 3, 100),
            free_line(2, p(2), 1, offer_tag(1)),
        ];
        let r = evaluate_buy_get(p(1), 3, &lines, &[blocked, open], &empty_catalog(), UserTier::Retail).unwrap();
        assert_eq!(r.offer_id, offer_id(2));
    }
}
