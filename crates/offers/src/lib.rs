//! Promotional offers: the typed offer model, boundary validation, discount
//! arithmetic and the shapes exchanged with the offer oracle.
//!
//! Offers are authored and stored elsewhere. They enter the engine as loosely
//! shaped [`OfferRecord`]s and are validated into the [`Offer`] tagged union
//! before any reconciliation runs.

pub mod cart;
pub mod offer;
pub mod outcome;
pub mod percent;
pub mod pricing;
pub mod record;

pub use cart::CartAggregate;
pub use offer::{BuyGet, Discount, Offer, OfferId, OfferKind, ProductDiscount, RegularDiscount};
pub use outcome::{AppliedOffer, FreeGrant, OracleOutcome};
pub use percent::Percent;
pub use pricing::{TrialPrice, apply_discount, forced_unit_price, resolve_unit_price};
pub use record::{OfferRecord, validate_catalog};
