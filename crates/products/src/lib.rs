//! Product catalog view used by reconciliation and settlement.
//!
//! The catalog itself is owned elsewhere; this crate models the read-only
//! snapshot the engine needs (prices per user tier, stock, variants).

pub mod catalog;
pub mod product;

pub use catalog::{CatalogSnapshot, ProductLookup};
pub use product::{ProductId, ProductSnapshot, UserTier, VariantId, VariantSnapshot};
