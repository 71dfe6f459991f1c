//! Dead-letter storage for undeliverable envelopes.

use std::sync::{Arc, Mutex};

use crate::envelope::Envelope;

/// An envelope that exhausted redelivery or failed non-retryably, kept
/// unmodified for manual inspection.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The channel the envelope was consumed from.
    pub channel: String,
    /// The envelope exactly as delivered.
    pub envelope: Envelope,
    /// The final handler error.
    pub reason: String,
    /// How many delivery attempts were made.
    pub attempts: u32,
}

/// Shared in-memory dead-letter store.
#[derive(Debug, Clone, Default)]
pub struct DeadLetterStore {
    inner: Arc<Mutex<Vec<DeadLetter>>>,
}

impl DeadLetterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dead letter.
    pub fn push(&self, dead_letter: DeadLetter) {
        metrics::counter!("bus_messages_dead_lettered_total").increment(1);
        tracing::error!(
            channel = %dead_letter.channel,
            message_type = %dead_letter.envelope.message_type,
            attempts = dead_letter.attempts,
            reason = %dead_letter.reason,
            "message dead-lettered"
        );
        self.inner.lock().unwrap().push(dead_letter);
    }

    /// Returns a snapshot of every dead letter.
    pub fn all(&self) -> Vec<DeadLetter> {
        self.inner.lock().unwrap().clone()
    }

    /// Returns the dead letters consumed from one channel.
    pub fn for_channel(&self, channel: &str) -> Vec<DeadLetter> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.channel == channel)
            .cloned()
            .collect()
    }

    /// Number of dead letters held.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// True if no envelope has been dead-lettered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
