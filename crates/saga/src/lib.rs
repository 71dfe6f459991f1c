//! Saga coordination for order fulfillment.
//!
//! The order fulfillment saga is choreographed: there is no saga-instance
//! record and no coordinator holding locks across services. The orchestrator
//! here subscribes to every event channel and reacts to each event with at
//! most one outgoing command and at most one history append; the forward
//! path is
//!
//! ```text
//! OrderCreated -> ReserveProduct -> ProductReserved -> ProcessPayment
//!              -> PaymentProcessed -> ApproveOrder
//! ```
//!
//! and every forward step has a compensating path: a failed reservation
//! rejects the order directly, and a failed payment releases the held stock
//! (`CancelProductReservation` -> `ProductReservationCancelled` ->
//! `RejectOrder`).

pub mod orchestrator;

pub use orchestrator::SagaOrchestrator;
