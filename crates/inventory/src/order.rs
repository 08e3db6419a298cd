//! Settlement view of a persisted order.

use serde::{Deserialize, Serialize};

use orderkit_products::{ProductId, VariantId};
use orderkit_sales::{OrderId, OrderLine};

use crate::free_items::{FreeItem, FreeItemSet};
use crate::stock::StockTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedLine {
    pub line_no: u32,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    #[serde(default)]
    pub is_free: bool,
    /// Durable flag: this line's variant stock has been deducted.
    #[serde(default)]
    pub stock_deducted: bool,
}

impl PlacedLine {
    /// Paid line whose stock the engine (not the catalog trigger) owns.
    pub fn is_variant_owned(&self) -> bool {
        !self.is_free && self.variant_id.is_some()
    }

    pub fn target(&self) -> StockTarget {
        StockTarget::for_line(self.product_id, self.variant_id)
    }
}

impl From<&OrderLine> for PlacedLine {
    fn from(line: &OrderLine) -> Self {
        Self {
            line_no: line.line_no,
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
            is_free: line.is_free,
            stock_deducted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub lines: Vec<PlacedLine>,
    #[serde(default)]
    pub free_items: Vec<FreeItem>,
}

impl PlacedOrder {
    /// Snapshot of a submitted draft; nothing deducted yet.
    pub fn from_draft(id: OrderId, lines: &[OrderLine]) -> Self {
        Self {
            id,
            status: OrderStatus::Placed,
            lines: lines.iter().map(PlacedLine::from).collect(),
            free_items: FreeItemSet::from_lines(lines).items().collect(),
        }
    }

    pub fn free_item_set(&self) -> FreeItemSet {
        self.free_items.iter().copied().collect()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// Variant lines still waiting for their deduction.
    pub fn pending_variant_lines(&self) -> impl Iterator<Item = &PlacedLine> {
        self.lines
            .iter()
            .filter(|l| l.is_variant_owned() && !l.stock_deducted)
    }

    /// Variant lines whose deduction has to be undone on cancel/delete.
    pub fn deducted_variant_lines(&self) -> impl Iterator<Item = &PlacedLine> {
        self.lines
            .iter()
            .filter(|l| l.is_variant_owned() && l.stock_deducted)
    }
}
