//! Order error types.

use bus::BusError;
use common::OrderId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order exists under the given id.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The order is already in a terminal state; the transition is dropped.
    #[error("order {order_id} is {current}, cannot transition to {requested}")]
    TerminalState {
        order_id: OrderId,
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// Publishing the order's event failed.
    #[error("publish failed: {0}")]
    Publish(#[from] BusError),
}
