use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orderkit_products::ProductId;

/// Paid quantity per product in a draft, as handed to the offer oracle.
///
/// Rebuilt on every reconciliation pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartAggregate(BTreeMap<ProductId, u32>);

impl CartAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.0.entry(product).or_insert(0) += quantity;
    }

    pub fn quantity(&self, product: ProductId) -> u32 {
        self.0.get(&product).copied().unwrap_or(0)
    }

    pub fn products(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.0.iter().map(|(p, q)| (*p, *q))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ProductId, u32)> for CartAggregate {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        let mut cart = Self::new();
        for (product, quantity) in iter {
            cart.add(product, quantity);
        }
        cart
    }
}
