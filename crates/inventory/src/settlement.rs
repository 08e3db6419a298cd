use serde::{Deserialize, Serialize};

use crate::stock::{Direction, StockTarget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied { before: i64, after: i64 },
    /// Already applied within the idempotency window.
    Skipped,
    Failed { reason: String },
}

/// Result of one stock write attempted during settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementItem {
    pub target: StockTarget,
    pub direction: Direction,
    pub quantity: u32,
    pub outcome: ItemOutcome,
}

impl SettlementItem {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed { .. })
    }
}

/// Per-item settlement results; one failure never blocks the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub success: bool,
    pub results: Vec<SettlementItem>,
}

impl SettlementReport {
    pub fn from_results(results: Vec<SettlementItem>) -> Self {
        Self {
            success: !results.iter().any(SettlementItem::is_failure),
            results,
        }
    }

    /// Nothing to do (e.g. order already cancelled).
    pub fn empty() -> Self {
        Self::from_results(Vec::new())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SettlementItem> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn applied(&self) -> impl Iterator<Item = &SettlementItem> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Applied { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderkit_products::ProductId;

    fn item(outcome: ItemOutcome) -> SettlementItem {
        SettlementItem {
            target: StockTarget::product(ProductId::from_u128(1)),
            direction: Direction::Deduct,
            quantity: 1,
            outcome,
        }
    }

    #[test]
    fn any_failure_clears_success() {
        let report = SettlementReport::from_results(vec![
            item(ItemOutcome::Applied { before: 2, after: 1 }),
            item(ItemOutcome::Failed { reason: "disk".into() }),
        ]);
        assert!(!report.success);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.applied().count(), 1);
    }

    #[test]
    fn skipped_items_are_not_failures() {
        let report = SettlementReport::from_results(vec![item(ItemOutcome::Skipped)]);
        assert!(report.success);
        assert!(SettlementReport::empty().success);
    }
}
