//! Shared types used by every service in the order saga.
//!
//! Identifiers are UUID newtypes so an order id can never be passed where a
//! payment id is expected; `Money` is an integer-cents amount.

pub mod ids;
pub mod money;

pub use ids::{CustomerId, MessageId, OrderId, PaymentId, ProductId};
pub use money::Money;
