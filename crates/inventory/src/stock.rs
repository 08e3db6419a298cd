use serde::{Deserialize, Serialize};

use orderkit_products::{ProductId, VariantId};

/// What a stock write touches: a product's own counter or one of its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockTarget {
    Product {
        product_id: ProductId,
    },
    Variant {
        product_id: ProductId,
        variant_id: VariantId,
    },
}

impl StockTarget {
    pub fn product(product_id: ProductId) -> Self {
        Self::Product { product_id }
    }

    pub fn variant(product_id: ProductId, variant_id: VariantId) -> Self {
        Self::Variant {
            product_id,
            variant_id,
        }
    }

    /// Variant target when a variant is given, product target otherwise.
    pub fn for_line(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        match variant_id {
            Some(variant_id) => Self::variant(product_id, variant_id),
            None => Self::product(product_id),
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            Self::Product { product_id } | Self::Variant { product_id, .. } => *product_id,
        }
    }

    pub fn variant_id(&self) -> Option<VariantId> {
        match self {
            Self::Product { .. } => None,
            Self::Variant { variant_id, .. } => Some(*variant_id),
        }
    }
}

/// Renders the id the stock row is keyed by (product or variant id).
impl core::fmt::Display for StockTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Product { product_id } => core::fmt::Display::fmt(product_id, f),
            Self::Variant { variant_id, .. } => core::fmt::Display::fmt(variant_id, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Deduct,
    Restore,
}

/// A stock counter and its availability flag, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i64,
    pub in_stock: bool,
}

impl StockLevel {
    pub fn new(quantity: i64) -> Self {
        Self {
            quantity,
            in_stock: quantity > 0,
        }
    }

    /// `max(0, current - qty)`.
    pub fn deduct(self, qty: u32) -> Self {
        Self::new(self.quantity.saturating_sub(i64::from(qty)).max(0))
    }

    pub fn restore(self, qty: u32) -> Self {
        Self::new(self.quantity.saturating_add(i64::from(qty)))
    }

    pub fn apply(self, direction: Direction, qty: u32) -> Self {
        match direction {
            Direction::Deduct => self.deduct(qty),
            Direction::Restore => self.restore(qty),
        }
    }
}

/// Parent product level recomputed from all of its variants.
pub fn resum_variants(variants: impl IntoIterator<Item = i64>) -> StockLevel {
    let total = variants.into_iter().fold(0i64, |acc, q| acc.saturating_add(q.max(0)));
    StockLevel::new(total)
}
