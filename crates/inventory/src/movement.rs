use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderkit_events::Event;
use orderkit_sales::OrderId;

use crate::stock::{Direction, StockTarget};

/// One applied stock write, published for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub order_id: OrderId,
    pub target: StockTarget,
    pub direction: Direction,
    pub delta: u32,
    pub before: i64,
    pub after: i64,
    pub occurred_at: DateTime<Utc>,
}

impl Event for StockMovement {
    fn event_type(&self) -> &'static str {
        match self.direction {
            Direction::Deduct => "inventory.stock.deducted",
            Direction::Restore => "inventory.stock.restored",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
