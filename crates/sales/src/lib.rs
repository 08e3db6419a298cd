//! Draft order lines and their reconciliation against promotional offers.
//!
//! Everything here is deterministic domain logic (no IO, no async). The
//! infrastructure layer fetches catalog data and consults the offer oracle,
//! then drives the pass through [`orchestrator`].

pub mod eligibility;
pub mod line;
pub mod orchestrator;
pub mod partition;
pub mod reconcile;
pub mod signature;

#[cfg(test)]
pub(crate) mod fixtures;

pub use eligibility::{Eligibility, evaluate_buy_get, qualifying_quantity};
pub use line::{OfferTag, OrderId, OrderLine, fingerprint, validate_lines};
pub use orchestrator::{
    FreeRef, PassContext, ReconcileMode, ReconcileOutcome, TrialPrices, TrialRequest, apply_oracle_outcome,
    cart_aggregate, prepare_pass, reconcile_pass, referenced_products, trial_requests,
};
pub use partition::merge_lines;
pub use reconcile::{DiscountPricing, ensure_discounted_qty, ensure_free_qty};
pub use signature::LineSignature;
