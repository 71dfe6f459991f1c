//! Commands dispatched by the saga orchestrator to the individual services.

use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// Commands on the orders channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderCommand {
    /// Move the order to APPROVED.
    ApproveOrder(ApproveOrderData),

    /// Move the order to REJECTED.
    RejectOrder(RejectOrderData),
}

/// Commands on the products channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductCommand {
    /// Reserve stock for the order.
    ReserveProduct(ReserveProductData),

    /// Release a prior reservation (compensating command).
    CancelProductReservation(CancelProductReservationData),
}

/// Commands on the payments channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentCommand {
    /// Settle the order total with the external processor.
    ProcessPayment(ProcessPaymentData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveOrderData {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOrderData {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveProductData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelProductReservationData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentData {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderCommand {
    /// Creates an ApproveOrder command.
    pub fn approve_order(order_id: OrderId) -> Self {
        OrderCommand::ApproveOrder(ApproveOrderData { order_id })
    }

    /// Creates a RejectOrder command.
    pub fn reject_order(order_id: OrderId) -> Self {
        OrderCommand::RejectOrder(RejectOrderData { order_id })
    }

    /// Returns the command name used for logging and dead-letter diagnostics.
    pub fn command_type(&self) -> &'static str {
        match self {
            OrderCommand::ApproveOrder(_) => "ApproveOrder",
            OrderCommand::RejectOrder(_) => "RejectOrder",
        }
    }
}

impl ProductCommand {
    /// Creates a ReserveProduct command.
    pub fn reserve_product(order_id: OrderId, product_id: ProductId, quantity: u32) -> Self {
        ProductCommand::ReserveProduct(ReserveProductData {
            order_id,
            product_id,
            quantity,
        })
    }

    /// Creates a CancelProductReservation command.
    pub fn cancel_product_reservation(
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        ProductCommand::CancelProductReservation(CancelProductReservationData {
            order_id,
            product_id,
            quantity,
        })
    }

    /// Returns the command name used for logging and dead-letter diagnostics.
    pub fn command_type(&self) -> &'static str {
        match self {
            ProductCommand::ReserveProduct(_) => "ReserveProduct",
            ProductCommand::CancelProductReservation(_) => "CancelProductReservation",
        }
    }
}

impl PaymentCommand {
    /// Creates a ProcessPayment command.
    pub fn process_payment(
        order_id: OrderId,
        product_id: ProductId,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        PaymentCommand::ProcessPayment(ProcessPaymentData {
            order_id,
            product_id,
            unit_price,
            quantity,
        })
    }

    /// Returns the command name used for logging and dead-letter diagnostics.
    pub fn command_type(&self) -> &'static str {
        match self {
            PaymentCommand::ProcessPayment(_) => "ProcessPayment",
        }
    }
}
