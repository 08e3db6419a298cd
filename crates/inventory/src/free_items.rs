//! Free-item sets and the edit-time union diff.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use orderkit_sales::{FreeRef, OrderLine};

use crate::stock::{Direction, StockTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeItem {
    pub target: StockTarget,
    pub quantity: u32,
}

/// Free quantity per stock target for one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreeItemSet(BTreeMap<StockTarget, u32>);

/// One stock write needed to move from an old free-item set to a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub target: StockTarget,
    pub direction: Direction,
    pub quantity: u32,
}

impl FreeItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: StockTarget, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.0.entry(target).or_insert(0) += quantity;
    }

    /// Overwrite the quantity held for `target`; zero removes it.
    pub fn set(&mut self, target: StockTarget, quantity: u32) {
        if quantity == 0 {
            self.0.remove(&target);
        } else {
            self.0.insert(target, quantity);
        }
    }

    /// Free lines of a reconciled draft, keyed by variant when one is set.
    pub fn from_lines(lines: &[OrderLine]) -> Self {
        lines
            .iter()
            .filter(|l| l.is_free)
            .map(|l| FreeItem {
                target: StockTarget::for_line(l.product_id, l.variant_id),
                quantity: l.quantity,
            })
            .collect()
    }

    /// Product-level set from a pass's `free_refs`.
    pub fn from_refs(refs: &[FreeRef]) -> Self {
        refs.iter()
            .map(|r| FreeItem {
                target: StockTarget::product(r.product_id),
                quantity: r.quantity,
            })
            .collect()
    }

    pub fn quantity(&self, target: &StockTarget) -> u32 {
        self.0.get(target).copied().unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = FreeItem> + '_ {
        self.0.iter().map(|(target, quantity)| FreeItem {
            target: *target,
            quantity: *quantity,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable hash of the set's contents.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Writes that turn `old` into `self`, over the union of both key sets:
    /// growth deducts, shrinkage restores, unchanged targets are skipped.
    pub fn diff_from(&self, old: &FreeItemSet) -> Vec<StockAdjustment> {
        let mut targets: Vec<StockTarget> = old.0.keys().chain(self.0.keys()).copied().collect();
        targets.sort();
        targets.dedup();

        targets
            .into_iter()
            .filter_map(|target| {
                let before = old.quantity(&target);
                let after = self.quantity(&target);
                let (direction, quantity) = match after.cmp(&before) {
                    core::cmp::Ordering::Greater => (Direction::Deduct, after - before),
                    core::cmp::Ordering::Less => (Direction::Restore, before - after),
                    core::cmp::Ordering::Equal => return None,
                };
                Some(StockAdjustment {
                    target,
                    direction,
                    quantity,
                })
            })
            .collect()
    }
}

impl FromIterator<FreeItem> for FreeItemSet {
    fn from_iter<I: IntoIterator<Item = FreeItem>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.add(item.target, item.quantity);
        }
        set
    }
}
