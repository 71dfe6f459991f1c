//! Products service.
//!
//! Owns the inventory ledger and consumes the products command channel,
//! answering every `ReserveProduct` with `ProductReserved` or
//! `ProductReservationFailed` and every `CancelProductReservation` with
//! `ProductReservationCancelled`.

pub mod error;
pub mod handler;
pub mod ledger;

pub use error::InventoryError;
pub use handler::ProductCommandsHandler;
pub use ledger::{InMemoryInventoryLedger, InventoryLedger, ProductRecord};
