use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use orderkit_offers::{CartAggregate, Offer, OfferId, OracleOutcome, TrialPrice};
use orderkit_products::{ProductId, ProductSnapshot, UserTier};

use crate::error::OracleError;
use crate::ports::OfferOracle;

type Respond = dyn Fn(&CartAggregate, UserTier) -> OracleOutcome + Send + Sync;

/// Scripted offer oracle.
pub struct StaticOfferOracle {
    respond: Box<Respond>,
    trial_prices: BTreeMap<(OfferId, ProductId), u64>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl core::fmt::Debug for StaticOfferOracle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StaticOfferOracle")
            .field("trial_prices", &self.trial_prices)
            .field("available", &self.available)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl StaticOfferOracle {
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&CartAggregate, UserTier) -> OracleOutcome + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            trial_prices: BTreeMap::new(),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same outcome for every cart.
    pub fn fixed(outcome: OracleOutcome) -> Self {
        Self::from_fn(move |_, _| outcome.clone())
    }

    /// Never applies anything.
    pub fn none() -> Self {
        Self::fixed(OracleOutcome::none())
    }

    pub fn with_trial_price(mut self, offer: OfferId, product: ProductId, price: u64) -> Self {
        self.trial_prices.insert((offer, product), price);
        self
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfferOracle for StaticOfferOracle {
    async fn apply_offers(
        &self,
        cart: &CartAggregate,
        tier: UserTier,
    ) -> Result<OracleOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("scripted outage".to_string()));
        }
        Ok((self.respond)(cart, tier))
    }

    async fn trial_unit_price(&self, offer: &Offer, product: &ProductSnapshot, _tier: UserTier) -> TrialPrice {
        self.trial_prices
            .get(&(offer.id, product.id))
            .map_or(TrialPrice::Fallback, |price| TrialPrice::Priced(*price))
    }
}
