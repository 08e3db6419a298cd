use serde::{Deserialize, Serialize};

use orderkit_core::{AggregateId, Entity, aggregate_id};

aggregate_id!(
    /// Product identifier.
    ProductId
);

aggregate_id!(
    /// Variant identifier (a purchasable configuration of a product).
    VariantId
);

/// Pricing tier of the user placing the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    #[default]
    Retail,
    Wholesale,
}

/// A variant with its own stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub id: VariantId,
    pub name: String,
    pub stock: i64,
}

/// Read-only product view.
///
/// Prices are in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    #[serde(default)]
    pub wholesale_price: Option<u64>,
    /// Product-level stock; for variant-bearing products this is the sum of
    /// the variants' stock.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub variants: Vec<VariantSnapshot>,
}

impl ProductSnapshot {
    pub fn new(id: ProductId, name: impl Into<String>, price: u64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            wholesale_price: None,
            stock: 0,
            variants: Vec::new(),
        }
    }

    pub fn with_wholesale_price(mut self, price: u64) -> Self {
        self.wholesale_price = Some(price);
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_variant(mut self, variant: VariantSnapshot) -> Self {
        self.variants.push(variant);
        self
    }

    /// Unit price shown to a user of the given tier.
    ///
    /// Wholesale users fall back to the retail price when no wholesale price
    /// is configured.
    pub fn display_price(&self, tier: UserTier) -> u64 {
        match tier {
            UserTier::Retail => self.price,
            UserTier::Wholesale => self.wholesale_price.unwrap_or(self.price),
        }
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    pub fn variant(&self, id: VariantId) -> Option<&VariantSnapshot> {
        self.variants.iter().find(|v| v.id == id)
    }
}

impl Entity for ProductSnapshot {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl From<AggregateId> for ProductId {
    fn from(value: AggregateId) -> Self {
        Self(value)
    }
}
