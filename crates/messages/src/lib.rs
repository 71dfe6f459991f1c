//! The wire protocol of the order fulfillment saga.
//!
//! Each service owns one command channel and one event channel; the payloads
//! flowing over a channel are grouped into a single tagged enum so consumers
//! can match exhaustively. Field sets are part of the protocol and carry
//! exactly the identifiers and amounts a downstream decision needs, nothing
//! derived.

pub mod channels;
pub mod commands;
pub mod events;

pub use commands::{
    ApproveOrderData, CancelProductReservationData, OrderCommand, ProcessPaymentData,
    ProductCommand, PaymentCommand, RejectOrderData, ReserveProductData,
};
pub use events::{
    OrderApprovedData, OrderCreatedData, OrderEvent, PaymentEvent, PaymentFailedData,
    PaymentProcessedData, ProductEvent, ProductReservationCancelledData,
    ProductReservationFailedData, ProductReservedData,
};
