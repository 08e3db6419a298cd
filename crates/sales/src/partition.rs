//! Line partitioner: one line per signature.

use std::collections::HashMap;

use crate::line::OrderLine;
use crate::signature::LineSignature;

/// Collapse lines that share a signature.
///
/// Quantities (and borrowed quantities) are summed; the first line seen for a
/// signature keeps its line number, price and offer name. Groups that end up
/// empty are dropped. Output order follows the first occurrence of each
/// signature, so repeated merges leave the list untouched.
pub fn merge_lines(lines: Vec<OrderLine>) -> Vec<OrderLine> {
    let mut order: Vec<LineSignature> = Vec::with_capacity(lines.len());
    let mut groups: HashMap<LineSignature, OrderLine> = HashMap::with_capacity(lines.len());

    for line in lines {
        let sig = line.signature();
        match groups.get_mut(&sig) {
            Some(first) => {
                first.quantity = first.quantity.saturating_add(line.quantity);
                first.borrowed_qty = first.borrowed_qty.saturating_add(line.borrowed_qty);
            }
            None => {
                order.push(sig);
                groups.insert(sig, line);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|sig| groups.remove(&sig))
        .filter(|line| line.quantity > 0)
        .map(|mut line| {
            line.borrowed_qty = if line.is_normal() {
                0
            } else {
                line.borrowed_qty.min(line.quantity)
            };
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, HashSet};

    #[test]
    fn sums_quantities_and_keeps_first_metadata() {
        let lines = vec![
            OrderLine::new(3, p(1), 2, 100),
            OrderLine::new(7, p(2), 1, 50),
            OrderLine::new(9, p(1), 5, 120),
        ];

        let merged = merge_lines(lines);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].line_no, 3);
        assert_eq!(merged[0].quantity, 7);
        assert_eq!(merged[0].unit_price, 100);
        assert_eq!(merged[1].product_id, p(2));
    }

    #[test]
    fn drops_empty_groups() {
        let lines = vec![OrderLine::new(1, p(1), 0, 100), OrderLine::new(2, p(2), 1, 10)];
        let merged = merge_lines(lines);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].product_id, p(2));
    }

    #[test]
    fn free_lines_merge_separately_from_paid_lines() {
        let tag = offer_tag(1);
        let lines = vec![
            OrderLine::new(1, p(1), 1, 100),
            free_line(2, p(1), 1, tag.clone()),
            free_line(3, p(1), 2, tag),
        ];
        let merged = merge_lines(lines);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].quantity, 3);
    }

    prop_compose! {
        fn arb_line()(
            line_no in 1u32..500,
            product in 1u128..4,
            quantity in 0u32..6,
            price in 0u64..300,
            kind in 0u8..4,
            offer in 1u128..3,
        ) -> OrderLine {
            let mut line = OrderLine::new(line_no, p(product), quantity, price);
            match kind {
                1 => {
                    line = free_line(line_no, p(product), quantity, offer_tag(offer));
                    line.borrowed_qty = quantity / 2;
                }
                2 => line = discounted_line(line_no, p(product), quantity, price, offer_tag(offer)),
                3 => line.trigger_offer_id = Some(offer_tag(offer).offer_id),
                _ => {}
            }
            line
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 500,
            ..ProptestConfig::default()
        })]

        /// Property: merging is idempotent.
        #[test]
        fn merge_is_idempotent(lines in prop::collection::vec(arb_line(), 0..12)) {
            let once = merge_lines(lines);
            let twice = merge_lines(once.clone());
            prop_assert_eq!(once, twice);
        }

        /// Property: no two merged lines share a signature.
        #[test]
        fn merged_signatures_are_unique(lines in prop::collection::vec(arb_line(), 0..12)) {
            let merged = merge_lines(lines);
            let sigs: HashSet<_> = merged.iter().map(OrderLine::signature).collect();
            prop_assert_eq!(sigs.len(), merged.len());
        }

        /// Property: per-signature totals do not depend on input order.
        #[test]
        fn totals_are_order_insensitive(lines in prop::collection::vec(arb_line(), 0..12)) {
            let totals = |ls: Vec<OrderLine>| -> BTreeMap<_, u32> {
                merge_lines(ls).into_iter().map(|l| (l.signature(), l.quantity)).collect()
            };
            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(totals(lines), totals(reversed));
        }
    }
}
