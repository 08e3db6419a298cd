//! Infrastructure layer: async ports, the services that drive the pure
//! reconciliation/settlement logic through them, and in-memory adapters.

pub mod adapters;
pub mod coalescer;
pub mod config;
pub mod error;
pub mod ports;
pub mod reconciliation;
pub mod session;
pub mod settlement;

pub use adapters::{InMemoryCatalog, InMemoryOrderStore, InMemoryStockStore, StaticOfferOracle};
pub use coalescer::{CoalesceKey, Coalesced, MutationCoalescer};
pub use config::EngineConfig;
pub use error::{OracleError, PortError, SettlementError};
pub use ports::{OfferOracle, OrderStore, ProductCatalog, StockStore};
pub use reconciliation::ReconciliationService;
pub use session::DraftSession;
pub use settlement::StockSettlementEngine;
