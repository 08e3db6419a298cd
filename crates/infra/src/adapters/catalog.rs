use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use orderkit_products::{ProductId, ProductSnapshot};

use super::poisoned;
use crate::error::PortError;
use crate::ports::ProductCatalog;

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, ProductSnapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: ProductSnapshot) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id, product);
        }
    }
}

impl FromIterator<ProductSnapshot> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = ProductSnapshot>>(iter: I) -> Self {
        Self {
            products: RwLock::new(iter.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, PortError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(&id).cloned())
    }
}
