//! Async driver for a reconciliation pass.

use tracing::{debug, info, warn};

use orderkit_core::DomainResult;
use orderkit_offers::{Offer, OracleOutcome};
use orderkit_products::{CatalogSnapshot, ProductId, ProductLookup, UserTier};
use orderkit_sales::{
    OrderLine, PassContext, ReconcileMode, ReconcileOutcome, TrialPrices, apply_oracle_outcome,
    prepare_pass, referenced_products, trial_requests,
};

use crate::ports::{OfferOracle, ProductCatalog};

/// Runs passes against a live catalog and offer oracle.
///
/// The service prefetches every product the pass may touch, consults the
/// oracle exactly once, prices trial units where the oracle gave no discount
/// total, then hands everything to the synchronous orchestrator. An oracle
/// outage degrades to "no offers applied" rather than failing the pass.
#[derive(Debug)]
pub struct ReconciliationService<O, C> {
    oracle: O,
    catalog: C,
}

impl<O, C> ReconciliationService<O, C>
where
    O: OfferOracle,
    C: ProductCatalog,
{
    pub fn new(oracle: O, catalog: C) -> Self {
        Self { oracle, catalog }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub async fn reconcile(
        &self,
        lines: Vec<OrderLine>,
        offers: &[Offer],
        tier: UserTier,
        mode: ReconcileMode,
    ) -> DomainResult<ReconcileOutcome> {
        let ids: Vec<ProductId> = referenced_products(&lines, offers).into_iter().collect();
        let snapshot: CatalogSnapshot = self.catalog.get_products(&ids).await?.into_iter().collect();
        debug!(requested = ids.len(), found = snapshot.len(), "catalog prefetched");

        let (lines, cart) = prepare_pass(lines, mode)?;

        let outcome = match self.oracle.apply_offers(&cart, tier).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "offer oracle failed; continuing with no offers applied");
                OracleOutcome::none()
            }
        };

        let mut trials = TrialPrices::new();
        for request in trial_requests(offers, &cart, &outcome, mode) {
            let offer = offers.iter().find(|o| o.id == request.offer_id);
            let product = snapshot.product(request.product_id);
            if let (Some(offer), Some(product)) = (offer, product) {
                let price = self.oracle.trial_unit_price(offer, product, tier).await;
                trials.insert(request, price);
            }
        }

        let ctx = PassContext {
            offers,
            catalog: &snapshot,
            tier,
            mode,
        };
        let result = apply_oracle_outcome(lines, &cart, &ctx, &outcome, &trials)?;

        info!(
            lines = result.items.len(),
            applied_offers = result.applied_offers.len(),
            free_refs = result.free_refs.len(),
            total_discount = result.total_discount,
            "reconciliation pass complete"
        );
        Ok(result)
    }
}
