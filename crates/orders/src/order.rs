//! Order state.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// The status of an order.
///
/// ```text
/// CREATED ──┬──► APPROVED
///           └──► REJECTED
/// ```
///
/// APPROVED and REJECTED are terminal; once reached, no further status
/// mutation is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order was placed; the saga is in flight.
    #[default]
    Created,

    /// Reservation and payment both succeeded (terminal).
    Approved,

    /// The saga took its rejection path (terminal).
    Rejected,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Approved | OrderStatus::Rejected)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order as held by the orders service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub status: OrderStatus,
}

impl Order {
    /// Creates a new order in CREATED.
    pub fn new(customer_id: CustomerId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            product_id,
            quantity,
            status: OrderStatus::Created,
        }
    }
}

/// One entry of an order's status history. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub recorded_at: DateTime<Utc>,
}
