//! Payment records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId, PaymentId, ProductId};
use serde::{Deserialize, Serialize};

/// A settled payment. Created once per successful settlement, immutable
/// thereafter; at most one exists per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
    pub total: Money,
}

/// Storage for payments, keyed by order id.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts the payment unless the order already has one; returns the
    /// record that ends up stored. First write wins.
    async fn insert(&self, payment: Payment) -> Payment;

    /// Looks up the payment for an order.
    async fn find_by_order(&self, order_id: OrderId) -> Option<Payment>;
}

/// In-memory payment store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<OrderId, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payments stored.
    pub fn len(&self) -> usize {
        self.payments.read().unwrap().len()
    }

    /// True if no payment has been stored.
    pub fn is_empty(&self) -> bool {
        self.payments.read().unwrap().is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Payment {
        let mut payments = self.payments.write().unwrap();
        payments
            .entry(payment.order_id)
            .or_insert(payment)
            .clone()
    }

    async fn find_by_order(&self, order_id: OrderId) -> Option<Payment> {
        self.payments.read().unwrap().get(&order_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(order_id: OrderId) -> Payment {
        Payment {
            id: PaymentId::new(),
            order_id,
            product_id: ProductId::new(),
            unit_price: Money::from_cents(1000),
            quantity: 3,
            total: Money::from_cents(3000),
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = InMemoryPaymentStore::new();
        let order_id = OrderId::new();

        let stored = store.insert(payment(order_id)).await;
        let found = store.find_by_order(order_id).await.unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(found.total, Money::from_cents(3000));
    }

    #[tokio::test]
    async fn first_write_wins_per_order() {
        let store = InMemoryPaymentStore::new();
        let order_id = OrderId::new();

        let first = store.insert(payment(order_id)).await;
        let second = store.insert(payment(order_id)).await;

        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_missing_order_is_none() {
        let store = InMemoryPaymentStore::new();
        assert!(store.find_by_order(OrderId::new()).await.is_none());
    }
}
