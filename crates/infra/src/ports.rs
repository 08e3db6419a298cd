//! Async ports to the engine's external collaborators.
//!
//! Implementations live outside this crate (catalog service, database, offer
//! engine); [`crate::adapters`] provides in-memory versions for tests and dev.

use std::sync::Arc;

use async_trait::async_trait;

use orderkit_inventory::{FreeItem, OrderStatus, PlacedOrder, StockLevel, StockTarget};
use orderkit_offers::{CartAggregate, Offer, OracleOutcome, TrialPrice};
use orderkit_products::{ProductId, ProductSnapshot, UserTier};
use orderkit_sales::OrderId;

use crate::error::{OracleError, PortError};

/// Authoritative offer engine.
#[async_trait]
pub trait OfferOracle: Send + Sync {
    /// Applied offers, free grants and the total discount for `cart`.
    async fn apply_offers(
        &self,
        cart: &CartAggregate,
        tier: UserTier,
    ) -> Result<OracleOutcome, OracleError>;

    /// Price one discounted unit of `product` under `offer`.
    async fn trial_unit_price(
        &self,
        _offer: &Offer,
        _product: &ProductSnapshot,
        _tier: UserTier,
    ) -> TrialPrice {
        TrialPrice::Fallback
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, PortError>;

    /// Known products among `ids`; unknown ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, PortError> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get_product(*id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }
}

/// Persisted stock counters and per-line deduction flags.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn read_stock(&self, target: &StockTarget) -> Result<StockLevel, PortError>;

    async fn write_stock(&self, target: &StockTarget, level: StockLevel) -> Result<(), PortError>;

    /// Current counters of every variant of `product`.
    async fn variant_stocks(&self, product: ProductId) -> Result<Vec<i64>, PortError>;

    async fn write_product_stock(&self, product: ProductId, level: StockLevel) -> Result<(), PortError>;

    async fn mark_line_deducted(
        &self,
        order: OrderId,
        line_no: u32,
        deducted: bool,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load_order(&self, id: OrderId) -> Result<Option<PlacedOrder>, PortError>;

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), PortError>;

    /// Replace the free items currently deducted against stock for `id`.
    async fn set_free_items(&self, id: OrderId, items: Vec<FreeItem>) -> Result<(), PortError>;

    async fn delete_order(&self, id: OrderId) -> Result<(), PortError>;
}

#[async_trait]
impl<T: OfferOracle + ?Sized> OfferOracle for Arc<T> {
    async fn apply_offers(
        &self,
        cart: &CartAggregate,
        tier: UserTier,
    ) -> Result<OracleOutcome, OracleError> {
        (**self).apply_offers(cart, tier).await
    }

    async fn trial_unit_price(&self, offer: &Offer, product: &ProductSnapshot, tier: UserTier) -> TrialPrice {
        (**self).trial_unit_price(offer, product, tier).await
    }
}

#[async_trait]
impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, PortError> {
        (**self).get_product(id).await
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, PortError> {
        (**self).get_products(ids).await
    }
}

#[async_trait]
impl<T: StockStore + ?Sized> StockStore for Arc<T> {
    async fn read_stock(&self, target: &StockTarget) -> Result<StockLevel, PortError> {
        (**self).read_stock(target).await
    }

    async fn write_stock(&self, target: &StockTarget, level: StockLevel) -> Result<(), PortError> {
        (**self).write_stock(target, level).await
    }

    async fn variant_stocks(&self, product: ProductId) -> Result<Vec<i64>, PortError> {
        (**self).variant_stocks(product).await
    }

    async fn write_product_stock(&self, product: ProductId, level: StockLevel) -> Result<(), PortError> {
        (**self).write_product_stock(product, level).await
    }

    async fn mark_line_deducted(
        &self,
        order: OrderId,
        line_no: u32,
        deducted: bool,
    ) -> Result<(), PortError> {
        (**self).mark_line_deducted(order, line_no, deducted).await
    }
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn load_order(&self, id: OrderId) -> Result<Option<PlacedOrder>, PortError> {
        (**self).load_order(id).await
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), PortError> {
        (**self).set_status(id, status).await
    }

    async fn set_free_items(&self, id: OrderId, items: Vec<FreeItem>) -> Result<(), PortError> {
        (**self).set_free_items(id, items).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), PortError> {
        (**self).delete_order(id).await
    }
}
