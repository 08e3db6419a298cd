//! One draft order's committed lines, guarded against superseded passes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use orderkit_core::{DomainError, DomainResult};
use orderkit_offers::Offer;
use orderkit_products::UserTier;
use orderkit_sales::{OrderLine, ReconcileMode, ReconcileOutcome, fingerprint};

use crate::ports::{OfferOracle, ProductCatalog};
use crate::reconciliation::ReconciliationService;

#[derive(Debug, Default)]
struct DraftState {
    lines: Vec<OrderLine>,
    /// Fingerprint of the most recent input handed to a pass.
    latest_input: Option<u64>,
}

/// Owns one draft. Every mutation runs a reconciliation pass; a pass whose
/// input was superseded while it awaited the oracle is dropped with
/// `StaleState` and never overwrites the committed lines.
#[derive(Debug)]
pub struct DraftSession<'s, O, C> {
    service: &'s ReconciliationService<O, C>,
    tier: UserTier,
    mode: ReconcileMode,
    state: Mutex<DraftState>,
}

impl<'s, O, C> DraftSession<'s, O, C>
where
    O: OfferOracle,
    C: ProductCatalog,
{
    pub fn new(service: &'s ReconciliationService<O, C>, tier: UserTier, mode: ReconcileMode) -> Self {
        Self {
            service,
            tier,
            mode,
            state: Mutex::new(DraftState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Committed lines.
    pub fn lines(&self) -> Vec<OrderLine> {
        self.state().lines.clone()
    }

    /// Reconcile `lines` and commit the result unless a newer input arrived
    /// in the meantime.
    pub async fn submit(&self, lines: Vec<OrderLine>, offers: &[Offer]) -> DomainResult<ReconcileOutcome> {
        let input = fingerprint(&lines);
        self.state().latest_input = Some(input);

        let outcome = self
            .service
            .reconcile(lines, offers, self.tier, self.mode)
            .await?;

        let mut state = self.state();
        if state.latest_input != Some(input) {
            warn!(input, "dropping superseded reconciliation pass");
            return Err(DomainError::stale("draft changed while the pass was running"));
        }
        state.lines = outcome.items.clone();
        info!(lines = state.lines.len(), "draft committed");
        Ok(outcome)
    }

    /// Re-run a pass over the committed lines (e.g. after the offer catalog changed).
    pub async fn refresh(&self, offers: &[Offer]) -> DomainResult<ReconcileOutcome> {
        let lines = self.lines();
        self.submit(lines, offers).await
    }
}
