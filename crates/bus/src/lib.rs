//! Message bus gateway for the order saga.
//!
//! Provides typed publish/subscribe over named channels with at-least-once
//! delivery and per-routing-key ordering, a redelivery policy that retries
//! transient handler failures with fixed backoff before dead-lettering, and
//! the idempotency guard services use to make side effects run at most once
//! per message identifier.
//!
//! The in-memory implementation is the deployment used by the services and
//! their tests; the traits are the seam a broker-backed implementation would
//! plug into.

pub mod dead_letter;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod idempotency;
pub mod memory;
pub mod retry;

pub use dead_letter::{DeadLetter, DeadLetterStore};
pub use envelope::Envelope;
pub use error::{BusError, HandlerError};
pub use gateway::{MessageBus, MessageHandler, publish_with_timeout};
pub use idempotency::{InMemoryProcessedMessageStore, MarkOutcome, ProcessedMessageStore};
pub use memory::InMemoryMessageBus;
pub use retry::{DeliveryOutcome, RetryPolicy};
