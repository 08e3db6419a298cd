//! Reconciliation orchestrator: one full pass over every active offer and
//! every line, in a fixed step order.
//!
//! A pass is split around the single oracle consultation so the caller can do
//! its IO in between:
//!
//! 1. [`prepare_pass`] validates the draft, strips stale offer metadata and
//!    builds the [`CartAggregate`] the oracle is asked about.
//! 2. The caller consults the oracle (and, optionally, prices trial units for
//!    the offers listed by [`trial_requests`]).
//! 3. [`apply_oracle_outcome`] converges free units, value buy-gets and flat
//!    discounts, re-tags trigger lines and merges the result.
//!
//! [`reconcile_pass`] runs all three steps with a synchronous oracle.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use orderkit_core::DomainResult;
use orderkit_offers::{
    AppliedOffer, CartAggregate, Offer, OfferId, OfferKind, OracleOutcome, TrialPrice, forced_unit_price,
};
use orderkit_products::{ProductId, ProductLookup, UserTier};

use crate::eligibility::qualifying_quantity;
use crate::line::{OfferTag, OrderLine, validate_lines};
use crate::partition::merge_lines;
use crate::reconcile::{DiscountPricing, ensure_discounted_qty, ensure_free_qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileMode {
    /// Apply product/store-wide discounts automatically. When off, offer
    /// metadata already on paid lines is left alone.
    pub auto_apply_simple_discounts: bool,
}

impl Default for ReconcileMode {
    fn default() -> Self {
        Self {
            auto_apply_simple_discounts: true,
        }
    }
}

/// Free quantity per product, for the settlement side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRef {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub items: Vec<OrderLine>,
    pub applied_offers: Vec<AppliedOffer>,
    pub free_refs: Vec<FreeRef>,
    pub total_discount: u64,
}

/// A discounted unit the caller may price through the offer collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialRequest {
    pub offer_id: OfferId,
    pub product_id: ProductId,
}

/// Trial prices gathered for a pass. Anything missing falls back to the
/// discount formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialPrices(BTreeMap<TrialRequest, TrialPrice>);

impl TrialPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, request: TrialRequest, price: TrialPrice) {
        self.0.insert(request, price);
    }

    pub fn get(&self, offer_id: OfferId, product_id: ProductId) -> TrialPrice {
        self.0
            .get(&TrialRequest { offer_id, product_id })
            .copied()
            .unwrap_or(TrialPrice::Fallback)
    }
}

impl FromIterator<(TrialRequest, TrialPrice)> for TrialPrices {
    fn from_iter<I: IntoIterator<Item = (TrialRequest, TrialPrice)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Read-only inputs shared by every step after the oracle call.
pub struct PassContext<'a, C> {
    pub offers: &'a [Offer],
    pub catalog: &'a C,
    pub tier: UserTier,
    pub mode: ReconcileMode,
}

/// Paid quantity per product.
pub fn cart_aggregate(lines: &[OrderLine]) -> CartAggregate {
    lines
        .iter()
        .filter(|l| !l.is_free)
        .map(|l| (l.product_id, l.quantity))
        .collect()
}

/// Steps 1 and 2: validate, strip stale offer metadata, aggregate.
pub fn prepare_pass(
    lines: Vec<OrderLine>,
    mode: ReconcileMode,
) -> DomainResult<(Vec<OrderLine>, CartAggregate)> {
    validate_lines(&lines)?;

    let lines = if mode.auto_apply_simple_discounts {
        merge_lines(lines.into_iter().map(strip_offer).collect())
    } else {
        merge_lines(lines)
    };
    let cart = cart_aggregate(&lines);
    Ok((lines, cart))
}

fn strip_offer(mut line: OrderLine) -> OrderLine {
    if line.is_free || line.offer.is_none() {
        return line;
    }
    if let Some(original) = line.original_price.take() {
        line.unit_price = original;
    }
    line.offer = None;
    line.borrowed_qty = 0;
    line
}

/// Every product the pass may need a snapshot of.
pub fn referenced_products(lines: &[OrderLine], offers: &[Offer]) -> BTreeSet<ProductId> {
    let mut products: BTreeSet<ProductId> = lines.iter().map(|l| l.product_id).collect();
    for offer in offers.iter().filter(|o| o.active) {
        if let Some(bg) = offer.buy_get() {
            products.insert(bg.linked_product_id);
            products.insert(bg.get_product_id);
        }
        if let OfferKind::ProductDiscount(pd) = &offer.kind {
            products.extend(pd.affected_product_ids.iter().copied());
        }
    }
    products
}

/// Discounted units whose price is not pinned by the oracle's discount total
/// and may be priced by a one-unit trial instead.
pub fn trial_requests(
    offers: &[Offer],
    cart: &CartAggregate,
    outcome: &OracleOutcome,
    mode: ReconcileMode,
) -> Vec<TrialRequest> {
    let mut requests = BTreeSet::new();
    for offer in offers.iter().filter(|o| o.active && outcome.is_applied(o.id)) {
        if let Some(bg) = offer.value_buy_get() {
            if outcome.positive_discount(offer.id).is_none() {
                requests.insert(TrialRequest {
                    offer_id: offer.id,
                    product_id: bg.get_product_id,
                });
            }
        } else if mode.auto_apply_simple_discounts && offer.flat_discount().is_some() {
            requests.extend(
                cart.products()
                    .filter(|p| offer.flat_discount_covers(*p))
                    .map(|product_id| TrialRequest {
                        offer_id: offer.id,
                        product_id,
                    }),
            );
        }
    }
    requests.into_iter().collect()
}

/// Steps 4 to 8, given the oracle's answer for `cart`.
pub fn apply_oracle_outcome<C: ProductLookup>(
    lines: Vec<OrderLine>,
    cart: &CartAggregate,
    ctx: &PassContext<'_, C>,
    outcome: &OracleOutcome,
    trials: &TrialPrices,
) -> DomainResult<ReconcileOutcome> {
    let mut offers: Vec<&Offer> = ctx.offers.iter().filter(|o| o.active).collect();
    offers.sort_by_key(|o| o.id);

    let lines = apply_free_offers(lines, ctx, &offers, outcome)?;
    let lines = apply_value_offers(lines, cart, ctx, &offers, outcome, trials)?;
    let lines = if ctx.mode.auto_apply_simple_discounts {
        apply_flat_discounts(lines, cart, ctx, &offers, outcome, trials)?
    } else {
        lines
    };
    let items = merge_lines(tag_triggers(lines, &offers));

    Ok(ReconcileOutcome {
        free_refs: free_refs(&items),
        items,
        applied_offers: outcome.applied_offers.clone(),
        total_discount: outcome.total_discount,
    })
}

/// A full pass with a synchronous oracle and formula pricing.
pub fn reconcile_pass<C, F>(
    lines: Vec<OrderLine>,
    ctx: &PassContext<'_, C>,
    oracle: F,
) -> DomainResult<ReconcileOutcome>
where
    C: ProductLookup,
    F: FnOnce(&CartAggregate) -> OracleOutcome,
{
    let (lines, cart) = prepare_pass(lines, ctx.mode)?;
    let outcome = oracle(&cart);
    apply_oracle_outcome(lines, &cart, ctx, &outcome, &TrialPrices::new())
}

fn offer_tag(offer_id: OfferId, offers: &[&Offer], outcome: &OracleOutcome) -> OfferTag {
    let name = offers
        .iter()
        .find(|o| o.id == offer_id)
        .map(|o| o.name.clone())
        .or_else(|| outcome.applied(offer_id).map(|a| a.offer_name.clone()))
        .unwrap_or_else(|| offer_id.to_string());
    OfferTag::new(offer_id, name)
}

/// Step 4: free units follow the oracle's grants; stale free lines revert.
fn apply_free_offers<C: ProductLookup>(
    mut lines: Vec<OrderLine>,
    ctx: &PassContext<'_, C>,
    offers: &[&Offer],
    outcome: &OracleOutcome,
) -> DomainResult<Vec<OrderLine>> {
    let targets = outcome.free_targets();

    for (&(offer_id, product_id), &qty) in &targets {
        let product = ctx.catalog.require(product_id)?;
        let tag = offer_tag(offer_id, offers, outcome);
        lines = ensure_free_qty(lines, product, qty, &tag, ctx.tier);
    }

    let stale: BTreeSet<(OfferId, ProductId)> = lines
        .iter()
        .filter(|l| l.is_free)
        .filter_map(|l| l.offer_id().map(|id| (id, l.product_id)))
        .filter(|key| !targets.contains_key(key))
        .collect();
    for (offer_id, product_id) in stale {
        let product = ctx.catalog.require(product_id)?;
        let tag = offer_tag(offer_id, offers, outcome);
        tracing::debug!(%offer_id, %product_id, "reverting free units no longer granted");
        lines = ensure_free_qty(lines, product, 0, &tag, ctx.tier);
    }
    Ok(lines)
}

/// Step 5: value buy-gets discount up to `times * per_trigger_qty` target units.
fn apply_value_offers<C: ProductLookup>(
    mut lines: Vec<OrderLine>,
    cart: &CartAggregate,
    ctx: &PassContext<'_, C>,
    offers: &[&Offer],
    outcome: &OracleOutcome,
    trials: &TrialPrices,
) -> DomainResult<Vec<OrderLine>> {
    for offer in offers {
        let Some(bg) = offer.value_buy_get() else {
            continue;
        };
        let target = bg.get_product_id;
        let current = lines
            .iter()
            .filter(|l| l.product_id == target && l.offer_id() == Some(offer.id))
            .map(|l| l.quantity)
            .sum::<u32>();

        let expected = if outcome.is_applied(offer.id) {
            let available = qualifying_quantity(&lines, target, offer.id);
            bg.granted_qty(cart.quantity(bg.linked_product_id)).min(available)
        } else {
            0
        };
        if expected == 0 && current == 0 {
            continue;
        }

        let product = ctx.catalog.require(target)?;
        let original = product.display_price(ctx.tier);
        let pricing = DiscountPricing {
            discount: bg.get_discount,
            forced_unit_price: outcome
                .positive_discount(offer.id)
                .and_then(|amount| forced_unit_price(original, amount, expected)),
            trial: trials.get(offer.id, target),
        };
        let tag = OfferTag::new(offer.id, offer.name.clone());
        lines = ensure_discounted_qty(lines, product, expected, &tag, &pricing, ctx.tier);
    }
    Ok(lines)
}

/// Step 6: product and store-wide discounts cover the full paid quantity of
/// every affected product.
fn apply_flat_discounts<C: ProductLookup>(
    mut lines: Vec<OrderLine>,
    cart: &CartAggregate,
    ctx: &PassContext<'_, C>,
    offers: &[&Offer],
    outcome: &OracleOutcome,
    trials: &TrialPrices,
) -> DomainResult<Vec<OrderLine>> {
    for offer in offers {
        let Some(discount) = offer.flat_discount() else {
            continue;
        };
        if !outcome.is_applied(offer.id) {
            continue;
        }
        let tag = OfferTag::new(offer.id, offer.name.clone());

        for product_id in cart.products().filter(|p| offer.flat_discount_covers(*p)) {
            let qty = qualifying_quantity(&lines, product_id, offer.id);
            if qty == 0 {
                continue;
            }
            let product = ctx.catalog.require(product_id)?;
            let pricing = DiscountPricing {
                discount,
                forced_unit_price: None,
                trial: trials.get(offer.id, product_id),
            };
            lines = ensure_discounted_qty(lines, product, qty, &tag, &pricing, ctx.tier);
        }
    }
    Ok(lines)
}

/// Step 7: mark paid lines of trigger products whose quantity satisfies a
/// buy-get offer. Display only.
fn tag_triggers(mut lines: Vec<OrderLine>, offers: &[&Offer]) -> Vec<OrderLine> {
    for line in &mut lines {
        line.trigger_offer_id = None;
    }
    for offer in offers {
        let Some(bg) = offer.buy_get() else {
            continue;
        };
        let linked = bg.linked_product_id;
        let qty = qualifying_quantity(&lines, linked, offer.id);
        if bg.buy_quantity == 0 || qty < bg.buy_quantity {
            continue;
        }
        for line in lines
            .iter_mut()
            .filter(|l| l.product_id == linked && l.is_normal() && l.trigger_offer_id.is_none())
        {
            line.trigger_offer_id = Some(offer.id);
        }
    }
    lines
}

fn free_refs(lines: &[OrderLine]) -> Vec<FreeRef> {
    let mut by_product: BTreeMap<ProductId, u32> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.is_free) {
        *by_product.entry(line.product_id).or_insert(0) += line.quantity;
    }
    by_product
        .into_iter()
        .map(|(product_id, quantity)| FreeRef {
            product_id,
            quantity,
        })
        .collect()
}
