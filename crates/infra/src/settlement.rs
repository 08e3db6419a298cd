//! Stock settlement engine.
//!
//! Owns free items and variant-bearing lines only; ordinary product stock is
//! maintained elsewhere. Every write is independent: one failure is reported
//! in the [`SettlementReport`] and the remaining items still run.
//!
//! Exactly-once guarantees come from three places:
//! - free-item deductions claim a key in the TTL [`IdempotencyLedger`],
//! - variant lines carry a durable `stock_deducted` flag,
//! - cancellation checks the order status and flips it once nothing is
//!   left to restore.
//!
//! The order's `free_items` always hold what is currently deducted: edits
//! rewrite them and restorations shrink them to the items still outstanding.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use orderkit_core::Clock;
use orderkit_events::EventBus;
use orderkit_inventory::{
    Direction, FreeItemSet, IdempotencyKey, IdempotencyLedger, ItemOutcome, OrderStatus, PlacedOrder,
    SettlementItem, SettlementReport, StockMovement, StockTarget, resum_variants,
};
use orderkit_products::ProductId;
use orderkit_sales::OrderId;

use crate::config::EngineConfig;
use crate::error::{PortError, SettlementError};
use crate::ports::{OrderStore, StockStore};

pub struct StockSettlementEngine<S, O, B> {
    stock: S,
    orders: O,
    bus: B,
    clock: Arc<dyn Clock>,
    ledger: Mutex<IdempotencyLedger>,
}

impl<S, O, B> core::fmt::Debug for StockSettlementEngine<S, O, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockSettlementEngine").finish_non_exhaustive()
    }
}

impl<S, O, B> StockSettlementEngine<S, O, B>
where
    S: StockStore,
    O: OrderStore,
    B: EventBus<StockMovement>,
{
    pub fn new(stock: S, orders: O, bus: B, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            stock,
            orders,
            bus,
            clock,
            ledger: Mutex::new(IdempotencyLedger::new(config.idempotency_ttl())),
        }
    }

    /// Deduct every free item and every variant line not yet deducted.
    ///
    /// `order` may be a stale snapshot; the per-line `stock_deducted` flags
    /// are re-read from the order store before any variant stock moves.
    pub async fn settle_on_place(&self, order: &PlacedOrder) -> Result<SettlementReport, SettlementError> {
        let stored = self.load(order.id).await?;
        if stored.is_cancelled() {
            warn!(order_id = %order.id, "refusing to settle placement of a cancelled order");
            return Ok(SettlementReport::empty());
        }

        let mut results = Vec::new();

        for item in &order.free_items {
            let key = IdempotencyKey::placement(order.id, &item.target);
            results.push(
                self.apply(order.id, item.target, Direction::Deduct, item.quantity, Some(key))
                    .await,
            );
        }

        for line in order.pending_variant_lines() {
            let already_deducted = stored
                .lines
                .iter()
                .any(|l| l.line_no == line.line_no && l.stock_deducted);
            if already_deducted {
                debug!(order_id = %order.id, line_no = line.line_no, "variant line already deducted");
                results.push(SettlementItem {
                    target: line.target(),
                    direction: Direction::Deduct,
                    quantity: line.quantity,
                    outcome: ItemOutcome::Skipped,
                });
                continue;
            }

            let mut result = self
                .apply(order.id, line.target(), Direction::Deduct, line.quantity, None)
                .await;
            if !result.is_failure() {
                if let Err(err) = self.stock.mark_line_deducted(order.id, line.line_no, true).await {
                    warn!(order_id = %order.id, line_no = line.line_no, error = %err, "failed to flag line as deducted");
                    result.outcome = ItemOutcome::Failed { reason: err.to_string() };
                }
            }
            results.push(result);
        }

        let report = SettlementReport::from_results(results);
        info!(order_id = %order.id, success = report.success, items = report.results.len(), "placement settled");
        Ok(report)
    }

    /// Restore everything a placed order took, once, then mark it cancelled.
    ///
    /// The status only flips when every restoration succeeded; otherwise the
    /// order stays placed with just the outstanding items recorded, so calling
    /// again finishes the job.
    pub async fn settle_on_cancel(&self, order_id: OrderId) -> Result<SettlementReport, SettlementError> {
        let order = self.load(order_id).await?;
        if order.is_cancelled() {
            info!(%order_id, "order already cancelled; nothing to restore");
            return Ok(SettlementReport::empty());
        }

        let report = self.restore_all(&order).await?;
        if !report.success {
            warn!(%order_id, failures = report.failures().count(), "cancellation incomplete; order left placed for retry");
            return Ok(report);
        }

        self.orders.set_status(order_id, OrderStatus::Cancelled).await?;
        info!(%order_id, items = report.results.len(), "cancellation settled");
        Ok(report)
    }

    /// Restore stock (unless the order was already cancelled), then remove
    /// the order. A failed restoration keeps the order so the delete can be
    /// retried.
    pub async fn settle_on_delete(&self, order_id: OrderId) -> Result<SettlementReport, SettlementError> {
        let order = self.load(order_id).await?;
        let report = if order.is_cancelled() {
            SettlementReport::empty()
        } else {
            self.restore_all(&order).await?
        };
        if !report.success {
            warn!(%order_id, failures = report.failures().count(), "deletion postponed; restoration incomplete");
            return Ok(report);
        }

        self.orders.delete_order(order_id).await?;
        info!(%order_id, items = report.results.len(), "deletion settled");
        Ok(report)
    }

    /// Apply the union diff between the old and new free-item sets of an
    /// edited order and record the resulting set on the order. Targets whose
    /// write failed keep their old quantity.
    pub async fn settle_on_edit(
        &self,
        order_id: OrderId,
        old: &FreeItemSet,
        new: &FreeItemSet,
    ) -> Result<SettlementReport, SettlementError> {
        self.load(order_id).await?;

        let fingerprint = new.fingerprint();
        let mut held = new.clone();
        let mut results = Vec::new();

        for adjustment in new.diff_from(old) {
            let key = match adjustment.direction {
                Direction::Deduct => Some(IdempotencyKey::edit(order_id, &adjustment.target, fingerprint)),
                Direction::Restore => None,
            };
            let result = self
                .apply(order_id, adjustment.target, adjustment.direction, adjustment.quantity, key)
                .await;
            if result.is_failure() {
                held.set(adjustment.target, old.quantity(&adjustment.target));
            }
            results.push(result);
        }

        self.orders
            .set_free_items(order_id, held.items().collect())
            .await?;

        let report = SettlementReport::from_results(results);
        info!(%order_id, success = report.success, items = report.results.len(), "edit settled");
        Ok(report)
    }

    async fn load(&self, order_id: OrderId) -> Result<PlacedOrder, SettlementError> {
        self.orders
            .load_order(order_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))
    }

    /// Restore every free item and deducted variant line of `order`.
    ///
    /// Variant lines clear their durable flag as they go; free items that
    /// could not be restored are written back as the order's outstanding set.
    async fn restore_all(&self, order: &PlacedOrder) -> Result<SettlementReport, SettlementError> {
        let mut results = Vec::new();
        let mut outstanding = Vec::new();

        for item in &order.free_items {
            let result = self
                .apply(order.id, item.target, Direction::Restore, item.quantity, None)
                .await;
            if result.is_failure() {
                outstanding.push(*item);
            }
            results.push(result);
        }

        for line in order.deducted_variant_lines() {
            let mut result = self
                .apply(order.id, line.target(), Direction::Restore, line.quantity, None)
                .await;
            if !result.is_failure() {
                if let Err(err) = self.stock.mark_line_deducted(order.id, line.line_no, false).await {
                    warn!(order_id = %order.id, line_no = line.line_no, error = %err, "failed to clear deduction flag");
                    result.outcome = ItemOutcome::Failed { reason: err.to_string() };
                }
            }
            results.push(result);
        }

        if outstanding != order.free_items {
            self.orders.set_free_items(order.id, outstanding).await?;
        }

        Ok(SettlementReport::from_results(results))
    }

    /// One guarded stock write, its movement event and (for variants) the
    /// parent resum.
    async fn apply(
        &self,
        order_id: OrderId,
        target: StockTarget,
        direction: Direction,
        quantity: u32,
        key: Option<IdempotencyKey>,
    ) -> SettlementItem {
        let outcome = match self.claim(key.as_ref()) {
            Ok(false) => {
                debug!(%order_id, %target, "deduction already applied within idempotency window");
                ItemOutcome::Skipped
            }
            Ok(true) => match self.write(target, direction, quantity).await {
                Ok((before, after)) => {
                    self.publish(order_id, target, direction, quantity, before, after);
                    if target.variant_id().is_some() {
                        self.resum(target.product_id()).await;
                    }
                    ItemOutcome::Applied { before, after }
                }
                Err(err) => {
                    if let Some(key) = &key {
                        self.release(key);
                    }
                    warn!(%order_id, %target, ?direction, quantity, error = %err, "stock update failed");
                    ItemOutcome::Failed { reason: err.to_string() }
                }
            },
            Err(err) => ItemOutcome::Failed { reason: err.to_string() },
        };

        SettlementItem {
            target,
            direction,
            quantity,
            outcome,
        }
    }

    fn claim(&self, key: Option<&IdempotencyKey>) -> Result<bool, SettlementError> {
        let Some(key) = key else {
            return Ok(true);
        };
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().map_err(|_| SettlementError::LedgerPoisoned)?;
        Ok(ledger.try_claim(key, now))
    }

    fn release(&self, key: &IdempotencyKey) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.release(key);
        }
    }

    async fn write(
        &self,
        target: StockTarget,
        direction: Direction,
        quantity: u32,
    ) -> Result<(i64, i64), PortError> {
        let current = self.stock.read_stock(&target).await?;
        let next = current.apply(direction, quantity);
        self.stock.write_stock(&target, next).await?;
        Ok((current.quantity, next.quantity))
    }

    /// Parent product counter := sum of all its variants.
    async fn resum(&self, product: ProductId) {
        let result = async {
            let level = resum_variants(self.stock.variant_stocks(product).await?);
            self.stock.write_product_stock(product, level).await?;
            Ok::<_, PortError>(level)
        }
        .await;

        match result {
            Ok(level) => debug!(%product, total = level.quantity, "variant stock resummed"),
            Err(err) => warn!(%product, error = %err, "variant resum failed"),
        }
    }

    fn publish(
        &self,
        order_id: OrderId,
        target: StockTarget,
        direction: Direction,
        delta: u32,
        before: i64,
        after: i64,
    ) {
        let movement = StockMovement {
            order_id,
            target,
            direction,
            delta,
            before,
            after,
            occurred_at: self.clock.now(),
        };
        if let Err(err) = self.bus.publish(movement) {
            warn!(%order_id, %target, error = ?err, "failed to publish stock movement");
        }
    }
}
