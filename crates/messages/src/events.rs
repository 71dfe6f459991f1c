//! Events announced by each service after a local state change.

use common::{CustomerId, Money, OrderId, PaymentId, ProductId};
use serde::{Deserialize, Serialize};

/// Events on the orders channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// An order was placed and persisted with status CREATED.
    OrderCreated(OrderCreatedData),

    /// The orders service approved the order.
    OrderApproved(OrderApprovedData),
}

/// Events on the products channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Stock was reserved for the order.
    ProductReserved(ProductReservedData),

    /// The reservation could not be made (insufficient stock or unknown
    /// product); the saga takes its rejection path.
    ProductReservationFailed(ProductReservationFailedData),

    /// A prior reservation was released back to stock.
    ProductReservationCancelled(ProductReservationCancelledData),
}

/// Events on the payments channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    /// Settlement succeeded and a payment record exists for the order.
    PaymentProcessed(PaymentProcessedData),

    /// Settlement was rejected; the saga compensates the reservation.
    PaymentFailed(PaymentFailedData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderApprovedData {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReservedData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReservationFailedData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReservationCancelledData {
    pub order_id: OrderId,
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessedData {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderEvent {
    /// Creates an OrderCreated event.
    pub fn order_created(
        order_id: OrderId,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            customer_id,
            product_id,
            quantity,
        })
    }

    /// Creates an OrderApproved event.
    pub fn order_approved(order_id: OrderId) -> Self {
        OrderEvent::OrderApproved(OrderApprovedData { order_id })
    }

    /// Returns the event name used for logging and dead-letter diagnostics.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::OrderApproved(_) => "OrderApproved",
        }
    }
}

impl ProductEvent {
    /// Creates a ProductReserved event.
    pub fn product_reserved(
        order_id: OrderId,
        product_id: ProductId,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        ProductEvent::ProductReserved(ProductReservedData {
            order_id,
            product_id,
            unit_price,
            quantity,
        })
    }

    /// Creates a ProductReservationFailed event.
    pub fn product_reservation_failed(
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        ProductEvent::ProductReservationFailed(ProductReservationFailedData {
            order_id,
            product_id,
            quantity,
        })
    }

    /// Creates a ProductReservationCancelled event.
    pub fn product_reservation_cancelled(order_id: OrderId, product_id: ProductId) -> Self {
        ProductEvent::ProductReservationCancelled(ProductReservationCancelledData {
            order_id,
            product_id,
        })
    }

    /// Returns the event name used for logging and dead-letter diagnostics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductReserved(_) => "ProductReserved",
            ProductEvent::ProductReservationFailed(_) => "ProductReservationFailed",
            ProductEvent::ProductReservationCancelled(_) => "ProductReservationCancelled",
        }
    }
}

impl PaymentEvent {
    /// Creates a PaymentProcessed event.
    pub fn payment_processed(order_id: OrderId, payment_id: PaymentId) -> Self {
        PaymentEvent::PaymentProcessed(PaymentProcessedData {
            order_id,
            payment_id,
        })
    }

    /// Creates a PaymentFailed event.
    pub fn payment_failed(order_id: OrderId, product_id: ProductId, quantity: u32) -> Self {
        PaymentEvent::PaymentFailed(PaymentFailedData {
            order_id,
            product_id,
            quantity,
        })
    }

    /// Returns the event name used for logging and dead-letter diagnostics.
    pub fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentProcessed(_) => "PaymentProcessed",
            PaymentEvent::PaymentFailed(_) => "PaymentFailed",
        }
    }
}
