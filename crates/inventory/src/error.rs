//! Inventory error types.

use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    /// The requested quantity exceeds the available stock. The ledger is
    /// left untouched.
    #[error("product {product_id} has insufficient stock for order {order_id}")]
    InsufficientStock {
        product_id: ProductId,
        order_id: OrderId,
    },

    /// No product exists under the given id.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
}
