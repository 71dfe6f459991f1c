//! The idempotency guard.
//!
//! Each service keeps its own record of processed message identifiers and
//! consults it before executing a side effect, so a redelivered message is a
//! no-op after its first successful processing. Check-and-insert is a single
//! atomic operation; under concurrent redelivery of the same identifier
//! exactly one caller observes `FirstDelivery`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::MessageId;

/// Result of attempting to mark a message as processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This caller won; the side effect belongs to it.
    FirstDelivery,
    /// Another delivery already processed this identifier.
    AlreadyProcessed,
}

/// Per-service record of handled message identifiers.
#[async_trait]
pub trait ProcessedMessageStore: Send + Sync {
    /// Returns true if the identifier was already marked.
    async fn already_processed(&self, message_id: MessageId) -> bool;

    /// Atomically marks the identifier, reporting whether this caller was
    /// first.
    async fn mark_processed(&self, message_id: MessageId) -> MarkOutcome;
}

/// In-memory guard backed by a set under a single lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessedMessageStore {
    seen: Arc<Mutex<HashSet<MessageId>>>,
}

impl InMemoryProcessedMessageStore {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers recorded.
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// True if no identifier has been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ProcessedMessageStore for InMemoryProcessedMessageStore {
    async fn already_processed(&self, message_id: MessageId) -> bool {
        self.seen.lock().unwrap().contains(&message_id)
    }

    async fn mark_processed(&self, message_id: MessageId) -> MarkOutcome {
        if self.seen.lock().unwrap().insert(message_id) {
            MarkOutcome::FirstDelivery
        } else {
            MarkOutcome::AlreadyProcessed
        }
    }
}
