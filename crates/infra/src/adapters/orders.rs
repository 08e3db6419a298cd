use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use orderkit_inventory::{FreeItem, OrderStatus, PlacedOrder};
use orderkit_sales::OrderId;

use super::poisoned;
use crate::error::PortError;
use crate::ports::OrderStore;

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, PlacedOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: PlacedOrder) {
        if let Ok(mut orders) = self.orders.write() {
            orders.insert(order.id, order);
        }
    }

    /// Snapshot of a stored order.
    pub fn get(&self, id: OrderId) -> Option<PlacedOrder> {
        self.orders.read().ok()?.get(&id).cloned()
    }

    pub fn set_line_deducted(&self, id: OrderId, line_no: u32, deducted: bool) -> Result<(), PortError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let line = orders
            .get_mut(&id)
            .and_then(|o| o.lines.iter_mut().find(|l| l.line_no == line_no))
            .ok_or_else(|| PortError::NotFound(format!("order {id} line {line_no}")))?;
        line.stock_deducted = deducted;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load_order(&self, id: OrderId) -> Result<Option<PlacedOrder>, PortError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), PortError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("order {id}")))?;
        order.status = status;
        Ok(())
    }

    async fn set_free_items(&self, id: OrderId, items: Vec<FreeItem>) -> Result<(), PortError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("order {id}")))?;
        order.free_items = items;
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), PortError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("order {id}")))
    }
}
