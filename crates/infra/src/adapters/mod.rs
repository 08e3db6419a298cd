//! In-memory port implementations for tests and local development.
//!
//! Locks are `std::sync` and are never held across an `.await`.

mod catalog;
mod oracle;
mod orders;
mod stock;

pub use catalog::InMemoryCatalog;
pub use oracle::StaticOfferOracle;
pub use orders::InMemoryOrderStore;
pub use stock::InMemoryStockStore;

fn poisoned() -> crate::error::PortError {
    crate::error::PortError::Unavailable("lock poisoned".to_string())
}
