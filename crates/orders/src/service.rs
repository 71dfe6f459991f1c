//! Order operations.

use std::time::Duration;

use bus::{Envelope, MessageBus, publish_with_timeout};
use common::{CustomerId, OrderId, ProductId};
use messages::OrderEvent;
use messages::channels::ORDERS_EVENTS;

use crate::error::OrderError;
use crate::order::{Order, OrderHistoryEntry, OrderStatus};
use crate::store::OrderStore;

/// Service for managing orders.
///
/// Placement persists the order and announces `OrderCreated`; approval and
/// rejection are driven exclusively by the saga's commands.
pub struct OrderService<S, B> {
    store: S,
    bus: B,
    publish_timeout: Duration,
}

impl<S, B> OrderService<S, B>
where
    S: OrderStore,
    B: MessageBus,
{
    /// Creates the service with its injected store and bus.
    pub fn new(store: S, bus: B, publish_timeout: Duration) -> Self {
        Self {
            store,
            bus,
            publish_timeout,
        }
    }

    async fn publish_event(
        &self,
        order_id: OrderId,
        event: &OrderEvent,
    ) -> Result<(), OrderError> {
        let envelope = Envelope::new(order_id.to_string(), event.event_type(), event)?;
        publish_with_timeout(&self.bus, ORDERS_EVENTS, envelope, self.publish_timeout).await?;
        Ok(())
    }

    /// Places an order: persists it as CREATED and announces `OrderCreated`.
    ///
    /// The caller only learns that the order was accepted for processing;
    /// the outcome is observable later through status and history reads.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Order, OrderError> {
        let order = Order::new(customer_id, product_id, quantity);
        self.store.create(order.clone()).await;
        tracing::info!(order_id = %order.id, "order placed");

        let event =
            OrderEvent::order_created(order.id, order.customer_id, order.product_id, quantity);
        self.publish_event(order.id, &event).await?;
        Ok(order)
    }

    /// Moves the order to APPROVED and announces `OrderApproved`.
    #[tracing::instrument(skip(self))]
    pub async fn approve_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        self.store
            .transition(order_id, OrderStatus::Approved)
            .await?;
        tracing::info!(%order_id, "order approved");
        metrics::counter!("orders_approved_total").increment(1);

        self.publish_event(order_id, &OrderEvent::order_approved(order_id))
            .await
    }

    /// Moves the order to REJECTED.
    #[tracing::instrument(skip(self))]
    pub async fn reject_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        self.store
            .transition(order_id, OrderStatus::Rejected)
            .await?;
        tracing::info!(%order_id, "order rejected");
        metrics::counter!("orders_rejected_total").increment(1);
        Ok(())
    }

    /// Looks up an order.
    pub async fn find(&self, order_id: OrderId) -> Option<Order> {
        self.store.get(order_id).await
    }

    /// Returns an order's status history.
    pub async fn history(&self, order_id: OrderId) -> Vec<OrderHistoryEntry> {
        self.store.history(order_id).await
    }
}
