//! The order lifecycle store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;

use crate::error::OrderError;
use crate::order::{Order, OrderHistoryEntry, OrderStatus};

/// Storage for orders and their status history.
///
/// This store is the sole writer of history entries; entries are never
/// updated or deleted.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    async fn create(&self, order: Order);

    /// Looks up an order.
    async fn get(&self, order_id: OrderId) -> Option<Order>;

    /// Moves an order to a new status and returns the updated order.
    ///
    /// A transition away from a terminal status is rejected; transitioning
    /// a terminal order to its current status is a no-op, so a redelivered
    /// command lands harmlessly.
    async fn transition(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError>;

    /// Appends a history entry stamped with the current time.
    async fn append_history(&self, order_id: OrderId, status: OrderStatus);

    /// Returns an order's history entries in append order.
    async fn history(&self, order_id: OrderId) -> Vec<OrderHistoryEntry>;
}

#[derive(Debug, Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    history: Vec<OrderHistoryEntry>,
}

/// In-memory order store behind a single lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) {
        self.state.write().unwrap().orders.insert(order.id, order);
    }

    async fn get(&self, order_id: OrderId) -> Option<Order> {
        self.state.read().unwrap().orders.get(&order_id).cloned()
    }

    async fn transition(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut state = self.state.write().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::NotFound(order_id))?;

        if order.status.is_terminal() && order.status != status {
            return Err(OrderError::TerminalState {
                order_id,
                current: order.status,
                requested: status,
            });
        }

        order.status = status;
        Ok(order.clone())
    }

    async fn append_history(&self, order_id: OrderId, status: OrderStatus) {
        self.state.write().unwrap().history.push(OrderHistoryEntry {
            order_id,
            status,
            recorded_at: Utc::now(),
        });
    }

    async fn history(&self, order_id: OrderId) -> Vec<OrderHistoryEntry> {
        self.state
            .read()
            .unwrap()
            .history
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, ProductId};

    async fn stored_order(store: &InMemoryOrderStore) -> Order {
        let order = Order::new(CustomerId::new(), ProductId::new(), 2);
        store.create(order.clone()).await;
        order
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;

        let found = store.get(order.id).await.unwrap();
        assert_eq!(found.status, OrderStatus::Created);
        assert_eq!(found.customer_id, order.customer_id);
    }

    #[tokio::test]
    async fn transition_updates_status() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;

        let updated = store
            .transition(order.id, OrderStatus::Approved)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Approved);
        assert_eq!(
            store.get(order.id).await.unwrap().status,
            OrderStatus::Approved
        );
    }

    #[tokio::test]
    async fn terminal_status_rejects_different_transition() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;

        store
            .transition(order.id, OrderStatus::Approved)
            .await
            .unwrap();
        let err = store
            .transition(order.id, OrderStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::TerminalState { .. }));
        assert_eq!(
            store.get(order.id).await.unwrap().status,
            OrderStatus::Approved
        );
    }

    #[tokio::test]
    async fn terminal_status_accepts_same_status() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;

        store
            .transition(order.id, OrderStatus::Rejected)
            .await
            .unwrap();
        store
            .transition(order.id, OrderStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(
            store.get(order.id).await.unwrap().status,
            OrderStatus::Rejected
        );
    }

    #[tokio::test]
    async fn transition_unknown_order_fails() {
        let store = InMemoryOrderStore::new();
        let err = store
            .transition(OrderId::new(), OrderStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_append_ordered_and_scoped_to_the_order() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;
        let other = stored_order(&store).await;

        store.append_history(order.id, OrderStatus::Created).await;
        store.append_history(other.id, OrderStatus::Created).await;
        store.append_history(order.id, OrderStatus::Approved).await;

        let history = store.history(order.id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, OrderStatus::Created);
        assert_eq!(history[1].status, OrderStatus::Approved);
        assert!(history[0].recorded_at <= history[1].recorded_at);
    }
}
