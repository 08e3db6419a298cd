//! Synchronous product lookup over a prefetched snapshot.

use std::collections::BTreeMap;

use orderkit_core::{DomainError, DomainResult};

use crate::product::{ProductId, ProductSnapshot, UserTier};

/// Read access to product data during a pure reconciliation pass.
pub trait ProductLookup {
    fn product(&self, id: ProductId) -> Option<&ProductSnapshot>;

    /// Like [`ProductLookup::product`] but reports a missing product as `NotFound`.
    fn require(&self, id: ProductId) -> DomainResult<&ProductSnapshot> {
        self.product(id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    fn display_price(&self, id: ProductId, tier: UserTier) -> DomainResult<u64> {
        self.require(id).map(|p| p.display_price(tier))
    }
}

/// Products fetched from the catalog collaborator for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    products: BTreeMap<ProductId, ProductSnapshot>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: ProductSnapshot) {
        self.products.insert(product.id, product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<ProductSnapshot> for CatalogSnapshot {
    fn from_iter<I: IntoIterator<Item = ProductSnapshot>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for product in iter {
            snapshot.insert(product);
        }
        snapshot
    }
}

impl ProductLookup for CatalogSnapshot {
    fn product(&self, id: ProductId) -> Option<&ProductSnapshot> {
        self.products.get(&id)
    }
}
