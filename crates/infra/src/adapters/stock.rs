use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use orderkit_inventory::{StockLevel, StockTarget};
use orderkit_products::ProductId;
use orderkit_sales::OrderId;

use super::{InMemoryOrderStore, poisoned};
use crate::error::PortError;
use crate::ports::StockStore;

#[derive(Debug, Default)]
struct StockState {
    levels: BTreeMap<StockTarget, StockLevel>,
    failing: HashSet<StockTarget>,
    deducted_lines: HashMap<(OrderId, u32), bool>,
    writes: usize,
}

/// Stock counters in memory.
///
/// Writes to a target registered with [`InMemoryStockStore::fail_writes_for`]
/// are rejected, which lets tests exercise per-item failure isolation. When
/// linked to an [`InMemoryOrderStore`], deduction flags are written through to
/// the stored order.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: RwLock<StockState>,
    orders: Option<Arc<InMemoryOrderStore>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn linked(orders: Arc<InMemoryOrderStore>) -> Self {
        Self {
            state: RwLock::default(),
            orders: Some(orders),
        }
    }

    pub fn set_stock(&self, target: StockTarget, quantity: i64) {
        if let Ok(mut state) = self.state.write() {
            state.levels.insert(target, StockLevel::new(quantity));
        }
    }

    /// Current counter, `None` when the target was never stocked.
    pub fn stock(&self, target: &StockTarget) -> Option<StockLevel> {
        self.state.read().ok()?.levels.get(target).copied()
    }

    pub fn fail_writes_for(&self, target: StockTarget) {
        if let Ok(mut state) = self.state.write() {
            state.failing.insert(target);
        }
    }

    pub fn heal(&self, target: &StockTarget) {
        if let Ok(mut state) = self.state.write() {
            state.failing.remove(target);
        }
    }

    /// Number of successful stock writes (variant resums included).
    pub fn write_count(&self) -> usize {
        self.state.read().map(|s| s.writes).unwrap_or(0)
    }

    pub fn line_deducted(&self, order: OrderId, line_no: u32) -> Option<bool> {
        self.state.read().ok()?.deducted_lines.get(&(order, line_no)).copied()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn read_stock(&self, target: &StockTarget) -> Result<StockLevel, PortError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state
            .levels
            .get(target)
            .copied()
            .ok_or_else(|| PortError::NotFound(format!("stock for {target}")))
    }

    async fn write_stock(&self, target: &StockTarget, level: StockLevel) -> Result<(), PortError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.failing.contains(target) {
            return Err(PortError::Write(format!("stock write rejected for {target}")));
        }
        state.levels.insert(*target, level);
        state.writes += 1;
        Ok(())
    }

    async fn variant_stocks(&self, product: ProductId) -> Result<Vec<i64>, PortError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .levels
            .iter()
            .filter(|(target, _)| target.variant_id().is_some() && target.product_id() == product)
            .map(|(_, level)| level.quantity)
            .collect())
    }

    async fn write_product_stock(&self, product: ProductId, level: StockLevel) -> Result<(), PortError> {
        self.write_stock(&StockTarget::product(product), level).await
    }

    async fn mark_line_deducted(
        &self,
        order: OrderId,
        line_no: u32,
        deducted: bool,
    ) -> Result<(), PortError> {
        if let Some(orders) = &self.orders {
            orders.set_line_deducted(order, line_no, deducted)?;
        }
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.deducted_lines.insert((order, line_no), deducted);
        Ok(())
    }
}
