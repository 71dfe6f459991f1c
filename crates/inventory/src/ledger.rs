//! The inventory ledger.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// A product and its available quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Units currently available; never negative.
    pub available_quantity: u32,
}

/// Per-product quantity ledger.
///
/// `reserve` and `release` are the units of atomicity: the availability
/// check and the quantity mutation happen together, and no lock is held
/// across any bus round trip. The outcome event for a mutation is published
/// by the caller only after the mutation has been applied.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Adds a product with a generated id and returns it.
    async fn create(
        &self,
        name: String,
        unit_price: Money,
        initial_quantity: u32,
    ) -> ProductRecord;

    /// Looks up a product.
    async fn get(&self, product_id: ProductId) -> Option<ProductRecord>;

    /// Returns every product.
    async fn list(&self) -> Vec<ProductRecord>;

    /// Atomically checks `available >= quantity` and decrements, returning
    /// the product as reserved. On insufficient stock the ledger is not
    /// mutated.
    async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<ProductRecord, InventoryError>;

    /// Atomically returns a reserved quantity to stock. The upstream
    /// idempotency guard prevents double-release of the same command; a
    /// release with no matching prior reserve is not detectable here.
    async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<(), InventoryError>;
}

/// In-memory ledger behind a single lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    products: Arc<RwLock<HashMap<ProductId, ProductRecord>>>,
}

impl InMemoryInventoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a product's available quantity, for assertions in tests and
    /// diagnostics.
    pub fn available(&self, product_id: ProductId) -> Option<u32> {
        self.products
            .read()
            .unwrap()
            .get(&product_id)
            .map(|p| p.available_quantity)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn create(
        &self,
        name: String,
        unit_price: Money,
        initial_quantity: u32,
    ) -> ProductRecord {
        let record = ProductRecord {
            id: ProductId::new(),
            name,
            unit_price,
            available_quantity: initial_quantity,
        };
        self.products
            .write()
            .unwrap()
            .insert(record.id, record.clone());
        record
    }

    async fn get(&self, product_id: ProductId) -> Option<ProductRecord> {
        self.products.read().unwrap().get(&product_id).cloned()
    }

    async fn list(&self) -> Vec<ProductRecord> {
        self.products.read().unwrap().values().cloned().collect()
    }

    #[tracing::instrument(skip(self))]
    async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<ProductRecord, InventoryError> {
        let mut products = self.products.write().unwrap();
        let record = products
            .get_mut(&product_id)
            .ok_or(InventoryError::ProductNotFound(product_id))?;

        if quantity > record.available_quantity {
            return Err(InventoryError::InsufficientStock {
                product_id,
                order_id,
            });
        }

        record.available_quantity -= quantity;
        metrics::counter!("inventory_reservations_total").increment(1);
        tracing::info!(%product_id, %order_id, quantity, remaining = record.available_quantity, "stock reserved");
        Ok(record.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<(), InventoryError> {
        let mut products = self.products.write().unwrap();
        let record = products
            .get_mut(&product_id)
            .ok_or(InventoryError::ProductNotFound(product_id))?;

        record.available_quantity += quantity;
        metrics::counter!("inventory_releases_total").increment(1);
        tracing::info!(%product_id, %order_id, quantity, available = record.available_quantity, "reservation released");
        Ok(())
    }
}
