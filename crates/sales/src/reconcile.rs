//! Quantity reconciler: converge the free/discounted quantity of one
//! `(product, offer)` pair towards a target.
//!
//! Both operations are target-setting: calling them again with the same target
//! is a no-op, which is what keeps repeated orchestrator passes stable.

use orderkit_offers::{Discount, TrialPrice, resolve_unit_price};
use orderkit_products::{ProductId, ProductSnapshot, UserTier, VariantId};

use crate::line::{OfferTag, OrderLine, next_line_no};
use crate::partition::merge_lines;

/// How a discounted unit is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountPricing {
    pub discount: Discount,
    /// Authoritative unit price derived from the oracle's discount total.
    pub forced_unit_price: Option<u64>,
    pub trial: TrialPrice,
}

impl DiscountPricing {
    /// Price purely from the discount formula.
    pub fn formula(discount: Discount) -> Self {
        Self {
            discount,
            forced_unit_price: None,
            trial: TrialPrice::Fallback,
        }
    }

    pub fn unit_price(&self, original: u64) -> u64 {
        resolve_unit_price(self.forced_unit_price, self.trial, &self.discount, original)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Free,
    Discounted { unit_price: u64 },
}

impl Conversion {
    fn is_free(self) -> bool {
        matches!(self, Conversion::Free)
    }

    fn unit_price(self) -> u64 {
        match self {
            Conversion::Free => 0,
            Conversion::Discounted { unit_price } => unit_price,
        }
    }
}

/// Converge the free quantity of `product` under `offer` to `target_qty`.
///
/// Growing pulls units from regular lines of the product in list order; any
/// shortfall becomes granted free units. Shrinking drops granted units first,
/// then hands borrowed units back to a regular line (created at the tier's
/// display price when none exists).
pub fn ensure_free_qty(
    lines: Vec<OrderLine>,
    product: &ProductSnapshot,
    target_qty: u32,
    offer: &OfferTag,
    tier: UserTier,
) -> Vec<OrderLine> {
    Converter::new(product, offer, Conversion::Free, tier).converge(lines, target_qty)
}

/// Converge the discounted quantity of `product` under `offer` to
/// `target_qty`.
///
/// Donor lines are drained closest-price first, so the customer sees the
/// smallest possible price jump. Units handed back are priced at the
/// product's current display price.
pub fn ensure_discounted_qty(
    lines: Vec<OrderLine>,
    product: &ProductSnapshot,
    target_qty: u32,
    offer: &OfferTag,
    pricing: &DiscountPricing,
    tier: UserTier,
) -> Vec<OrderLine> {
    let unit_price = pricing.unit_price(product.display_price(tier));
    Converter::new(product, offer, Conversion::Discounted { unit_price }, tier)
        .converge(lines, target_qty)
}

struct Converter<'a> {
    product_id: ProductId,
    display_price: u64,
    offer: &'a OfferTag,
    conversion: Conversion,
}

impl<'a> Converter<'a> {
    fn new(product: &ProductSnapshot, offer: &'a OfferTag, conversion: Conversion, tier: UserTier) -> Self {
        Self {
            product_id: product.id,
            display_price: product.display_price(tier),
            offer,
            conversion,
        }
    }

    fn is_converted(&self, line: &OrderLine) -> bool {
        line.product_id == self.product_id
            && line.is_free == self.conversion.is_free()
            && line.offer_id() == Some(self.offer.offer_id)
    }

    fn converge(&self, mut lines: Vec<OrderLine>, target_qty: u32) -> Vec<OrderLine> {
        if let Conversion::Discounted { unit_price } = self.conversion {
            for line in lines.iter_mut().filter(|l| self.is_converted(l)) {
                line.unit_price = unit_price;
            }
        }

        let current: u32 = lines
            .iter()
            .filter(|l| self.is_converted(l))
            .map(|l| l.quantity)
            .sum();

        tracing::debug!(
            product_id = %self.product_id,
            offer_id = %self.offer.offer_id,
            free = self.conversion.is_free(),
            current,
            target = target_qty,
            "converging offer quantity"
        );

        if target_qty > current {
            self.grow(&mut lines, target_qty - current);
        } else if target_qty < current {
            self.shrink(&mut lines, current - target_qty);
        }

        merge_lines(lines)
    }

    fn grow(&self, lines: &mut Vec<OrderLine>, mut remaining: u32) {
        let mut next_no = next_line_no(lines);

        let mut donors: Vec<usize> = (0..lines.len())
            .filter(|&i| {
                let l = &lines[i];
                l.product_id == self.product_id && l.is_normal() && l.quantity > 0
            })
            .collect();
        if let Conversion::Discounted { unit_price } = self.conversion {
            donors.sort_by_key(|&i| lines[i].unit_price.abs_diff(unit_price));
        }

        for i in donors {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lines[i].quantity);
            let variant = lines[i].variant_id;
            remaining -= take;

            // A fully drained donor is converted in place so its line number survives.
            if take == lines[i].quantity && self.converted_index(lines, variant).is_none() {
                self.convert(&mut lines[i]);
                continue;
            }
            lines[i].quantity -= take;
            let price = lines[i].unit_price;
            self.add_converted(lines, variant, take, take, price, &mut next_no);
        }

        if remaining > 0 {
            self.add_converted(lines, None, remaining, 0, self.display_price, &mut next_no);
        }
    }

    fn shrink(&self, lines: &mut Vec<OrderLine>, mut excess: u32) {
        let mut next_no = next_line_no(lines);
        let converted: Vec<usize> = (0..lines.len())
            .rev()
            .filter(|&i| self.is_converted(&lines[i]))
            .collect();

        // Granted units were never paid for; they simply disappear.
        for &i in &converted {
            if excess == 0 {
                break;
            }
            let line = &mut lines[i];
            let granted = line.quantity - line.borrowed_qty.min(line.quantity);
            let dropped = excess.min(granted);
            line.quantity -= dropped;
            excess -= dropped;
        }

        for &i in &converted {
            if excess == 0 {
                break;
            }
            let take = excess.min(lines[i].quantity);
            let variant = lines[i].variant_id;
            excess -= take;

            if take == lines[i].quantity && self.paid_index(lines, variant).is_none() {
                self.revert(&mut lines[i]);
                continue;
            }
            let line = &mut lines[i];
            line.quantity -= take;
            line.borrowed_qty = line.borrowed_qty.saturating_sub(take).min(line.quantity);
            self.return_to_paid(lines, variant, take, &mut next_no);
        }
    }

    fn converted_index(&self, lines: &[OrderLine], variant: Option<VariantId>) -> Option<usize> {
        lines
            .iter()
            .position(|l| self.is_converted(l) && l.variant_id == variant)
    }

    /// Regular line that returned units are merged onto.
    fn paid_index(&self, lines: &[OrderLine], variant: Option<VariantId>) -> Option<usize> {
        let any_price = self.conversion.is_free();
        lines.iter().position(|l| {
            l.product_id == self.product_id
                && l.variant_id == variant
                && l.is_normal()
                && (any_price || l.unit_price == self.display_price)
        })
    }

    fn convert(&self, line: &mut OrderLine) {
        line.original_price = Some(line.unit_price);
        line.unit_price = self.conversion.unit_price();
        line.is_free = self.conversion.is_free();
        line.offer = Some(self.offer.clone());
        line.trigger_offer_id = None;
        line.borrowed_qty = line.quantity;
    }

    fn revert(&self, line: &mut OrderLine) {
        line.unit_price = self.display_price;
        line.original_price = None;
        line.is_free = false;
        line.offer = None;
        line.borrowed_qty = 0;
    }

    fn add_converted(
        &self,
        lines: &mut Vec<OrderLine>,
        variant: Option<VariantId>,
        quantity: u32,
        borrowed: u32,
        original_price: u64,
        next_no: &mut u32,
    ) {
        if quantity == 0 {
            return;
        }
        if let Some(i) = self.converted_index(lines, variant) {
            lines[i].quantity += quantity;
            lines[i].borrowed_qty += borrowed;
            return;
        }

        lines.push(OrderLine {
            line_no: *next_no,
            product_id: self.product_id,
            variant_id: variant,
            quantity,
            unit_price: self.conversion.unit_price(),
            original_price: Some(original_price),
            is_free: self.conversion.is_free(),
            offer: Some(self.offer.clone()),
            trigger_offer_id: None,
            borrowed_qty: borrowed,
        });
        *next_no += 1;
    }

    fn return_to_paid(
        &self,
        lines: &mut Vec<OrderLine>,
        variant: Option<VariantId>,
        quantity: u32,
        next_no: &mut u32,
    ) {
        if quantity == 0 {
            return;
        }
        match self.paid_index(lines, variant) {
            Some(i) => lines[i].quantity += quantity,
            None => {
                let mut line = OrderLine::new(*next_no, self.product_id, quantity, self.display_price);
                line.variant_id = variant;
                lines.push(line);
                *next_no += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use orderkit_offers::Percent;
    use proptest::prelude::*;

    fn ten_pct() -> DiscountPricing {
        DiscountPricing::formula(Discount::Percentage(Percent::whole(10).unwrap()))
    }

    #[test]
    fn free_qty_is_pulled_from_paid_lines() {
        let lines = vec![OrderLine::new(1, p(2), 3, 40)];
        let out = ensure_free_qty(lines, &product(2, 40), 1, &offer_tag(1), UserTier::Retail);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].quantity, 2);
        assert!(out[1].is_free);
        assert_eq!(out[1].quantity, 1);
        assert_eq!(out[1].unit_price, 0);
        assert_eq!(out[1].original_price, Some(40));
        assert_eq!(out[1].borrowed_qty, 1);
        assert_eq!(out[1].line_no, 2);
    }

    #[test]
    fn missing_paid_units_become_granted_free_units() {
        let out = ensure_free_qty(vec![], &product(2, 40), 2, &offer_tag(1), UserTier::Retail);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_free);
        assert_eq!(out[0].quantity, 2);
        assert_eq!(out[0].borrowed_qty, 0);
        assert_eq!(out[0].original_price, Some(40));
    }

    #[test]
    fn shrinking_free_qty_drops_granted_units_first() {
        let mut free = free_line(2, p(2), 3, offer_tag(1));
        free.borrowed_qty = 1;
        let lines = vec![OrderLine::new(1, p(2), 1, 40), free];

        let out = ensure_free_qty(lines.clone(), &product(2, 40), 1, &offer_tag(1), UserTier::Retail);
        assert_eq!(qty_of(&out, p(2)), 2);
        assert_eq!(out.iter().find(|l| l.is_free).unwrap().quantity, 1);

        let out = ensure_free_qty(lines, &product(2, 40), 0, &offer_tag(1), UserTier::Retail);
        assert_eq!(out, vec![OrderLine::new(1, p(2), 2, 40)]);
    }

    #[test]
    fn returned_free_units_create_a_paid_line_at_tier_price() {
        let mut free = free_line(1, p(2), 2, offer_tag(1));
        free.borrowed_qty = 2;
        let snapshot = product(2, 40).with_wholesale_price(30);

        let out = ensure_free_qty(vec![free], &snapshot, 0, &offer_tag(1), UserTier::Wholesale);

        assert_eq!(out.len(), 1);
        assert!(out[0].is_normal());
        assert_eq!(out[0].quantity, 2);
        assert_eq!(out[0].unit_price, 30);
    }

    #[test]
    fn repeated_calls_are_stable() {
        let lines = vec![OrderLine::new(1, p(2), 3, 40)];
        let once = ensure_free_qty(lines, &product(2, 40), 2, &offer_tag(1), UserTier::Retail);
        let twice = ensure_free_qty(once.clone(), &product(2, 40), 2, &offer_tag(1), UserTier::Retail);
        assert_eq!(once, twice);
    }

    #[test]
    fn discounted_qty_uses_formula_price() {
        let lines = vec![OrderLine::new(1, p(3), 4, 100)];
        let out = ensure_discounted_qty(lines, &product(3, 100), 4, &offer_tag(1), &ten_pct(), UserTier::Retail);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity, 4);
        assert_eq!(out[0].unit_price, 90);
        assert_eq!(out[0].original_price, Some(100));
        assert_eq!(out[0].offer_id(), Some(offer_id(1)));
    }

    #[test]
    fn forced_price_wins_over_trial_and_formula() {
        let pricing = DiscountPricing {
            forced_unit_price: Some(35),
            trial: TrialPrice::Priced(20),
            ..ten_pct()
        };
        let lines = vec![OrderLine::new(1, p(3), 3, 40)];
        let out = ensure_discounted_qty(lines, &product(3, 40), 3, &offer_tag(1), &pricing, UserTier::Retail);
        assert_eq!(out[0].unit_price, 35);
    }

    #[test]
    fn donors_are_drained_closest_price_first() {
        // discounted price is 90; the line at 95 is closer than the one at 150
        let lines = vec![
            OrderLine::new(1, p(3), 2, 150).with_variant(v(1)),
            OrderLine::new(2, p(3), 2, 95).with_variant(v(2)),
        ];
        let out = ensure_discounted_qty(lines, &product(3, 100), 1, &offer_tag(1), &ten_pct(), UserTier::Retail);

        let untouched = out.iter().find(|l| l.variant_id == Some(v(1)) && l.is_normal()).unwrap();
        assert_eq!(untouched.quantity, 2);
        let drained = out.iter().find(|l| l.variant_id == Some(v(2)) && l.is_normal()).unwrap();
        assert_eq!(drained.quantity, 1);
        let discounted = out.iter().find(|l| l.offer.is_some()).unwrap();
        assert_eq!(discounted.variant_id, Some(v(2)));
        assert_eq!(discounted.original_price, Some(95));
    }

    #[test]
    fn shrinking_discount_returns_units_at_current_price() {
        let lines = vec![discounted_line(1, p(3), 3, 90, offer_tag(1))];
        let out = ensure_discounted_qty(lines, &product(3, 110), 1, &offer_tag(1), &ten_pct(), UserTier::Retail);

        let paid = out.iter().find(|l| l.is_normal()).unwrap();
        assert_eq!(paid.quantity, 2);
        assert_eq!(paid.unit_price, 110);
        let discounted = out.iter().find(|l| l.offer.is_some()).unwrap();
        assert_eq!(discounted.quantity, 1);
        assert_eq!(discounted.unit_price, 99);
    }

    #[test]
    fn other_offers_lines_are_never_donors() {
        let lines = vec![discounted_line(1, p(3), 2, 80, offer_tag(2))];
        let out = ensure_discounted_qty(lines.clone(), &product(3, 100), 1, &offer_tag(1), &ten_pct(), UserTier::Retail);
        assert!(out.contains(&lines[0]));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 300,
            ..ProptestConfig::default()
        })]

        /// Property: with enough paid units, converging free quantity up and
        /// back down never changes the product's total quantity.
        #[test]
        fn free_conversion_conserves_quantity(
            paid in prop::collection::vec(1u32..5, 1..4),
            first in 0u32..20,
            second in 0u32..20,
        ) {
            let lines: Vec<_> = paid
                .iter()
                .enumerate()
                .map(|(i, q)| OrderLine::new(i as u32 + 1, p(2), *q, 40 + i as u64).with_variant(v(i as u128)))
                .collect();
            let total: u32 = paid.iter().sum();
            let first = first.min(total);
            let second = second.min(total);
            let snapshot = product(2, 40);

            let out = ensure_free_qty(lines, &snapshot, first, &offer_tag(1), UserTier::Retail);
            prop_assert_eq!(qty_of(&out, p(2)), total);
            let out = ensure_free_qty(out, &snapshot, second, &offer_tag(1), UserTier::Retail);
            prop_assert_eq!(qty_of(&out, p(2)), total);
            let free: u32 = out.iter().filter(|l| l.is_free).map(|l| l.quantity).sum();
            prop_assert_eq!(free, second);
        }

        /// Property: discounted conversion conserves quantity as well.
        #[test]
        fn discounted_conversion_conserves_quantity(
            paid in prop::collection::vec(1u32..5, 1..4),
            first in 0u32..20,
            second in 0u32..20,
        ) {
            let lines: Vec<_> = paid
                .iter()
                .enumerate()
                .map(|(i, q)| OrderLine::new(i as u32 + 1, p(3), *q, 90 + 5 * i as u64).with_variant(v(i as u128)))
                .collect();
            let total: u32 = paid.iter().sum();
            let snapshot = product(3, 100);

            let out = ensure_discounted_qty(lines, &snapshot, first.min(total), &offer_tag(1), &ten_pct(), UserTier::Retail);
            prop_assert_eq!(qty_of(&out, p(3)), total);
            let out = ensure_discounted_qty(out, &snapshot, second.min(total), &offer_tag(1), &ten_pct(), UserTier::Retail);
            prop_assert_eq!(qty_of(&out, p(3)), total);
        }
    }
}
