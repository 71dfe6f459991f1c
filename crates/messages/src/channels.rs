//! Channel names for the saga's commands and events.
//!
//! Every message on these channels is keyed by the order id, so the bus
//! delivers all traffic for one order in emission order.

/// Events published by the orders service (`OrderEvent`).
pub const ORDERS_EVENTS: &str = "orders-events";

/// Commands consumed by the orders service (`OrderCommand`).
pub const ORDERS_COMMANDS: &str = "orders-commands";

/// Events published by the products service (`ProductEvent`).
pub const PRODUCTS_EVENTS: &str = "products-events";

/// Commands consumed by the products service (`ProductCommand`).
pub const PRODUCTS_COMMANDS: &str = "products-commands";

/// Events published by the payments service (`PaymentEvent`).
pub const PAYMENTS_EVENTS: &str = "payments-events";

/// Commands consumed by the payments service (`PaymentCommand`).
pub const PAYMENTS_COMMANDS: &str = "payments-commands";
