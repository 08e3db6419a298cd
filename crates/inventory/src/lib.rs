//! Inventory settlement domain.
//!
//! Deterministic rules for free-item and variant stock settlement (no IO). The
//! infrastructure layer reads and writes stock through ports and uses the
//! types here to decide what to write and whether it already did.

pub mod free_items;
pub mod idempotency;
pub mod movement;
pub mod order;
pub mod settlement;
pub mod stock;

pub use free_items::{FreeItem, FreeItemSet, StockAdjustment};
pub use idempotency::{IdempotencyKey, IdempotencyLedger};
pub use movement::StockMovement;
pub use order::{OrderStatus, PlacedLine, PlacedOrder};
pub use settlement::{ItemOutcome, SettlementItem, SettlementReport};
pub use stock::{Direction, StockLevel, StockTarget, resum_variants};
