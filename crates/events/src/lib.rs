//! Observability events and the bus that carries them.
//!
//! Stock settlement publishes one event per deduction/restoration instead of
//! writing to a log side channel; consumers subscribe here.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
