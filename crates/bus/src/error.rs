//! Bus and handler error types.

use std::time::Duration;

use thiserror::Error;

/// Errors from the bus itself.
#[derive(Debug, Error)]
pub enum BusError {
    /// A channel already has a subscriber; each channel is consumed by
    /// exactly one service.
    #[error("channel '{0}' already has a subscriber")]
    AlreadySubscribed(String),

    /// The channel's delivery workers are gone.
    #[error("channel '{0}' is closed")]
    ChannelClosed(String),

    /// Publishing did not complete within the configured timeout.
    #[error("publish to '{channel}' timed out after {timeout:?}")]
    PublishTimeout { channel: String, timeout: Duration },

    /// Payload serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The outcome a handler reports for one delivery.
///
/// The variant, not the payload, drives the redelivery decision: retryable
/// failures are redelivered with backoff up to the policy's attempt bound,
/// everything else goes straight to the dead-letter store.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Transient failure; the delivery should be retried.
    #[error("retryable: {0}")]
    Retryable(String),

    /// Permanent failure; redelivery cannot succeed.
    #[error("non-retryable: {0}")]
    NonRetryable(String),
}

impl HandlerError {
    /// Creates a retryable failure.
    pub fn retryable(message: impl Into<String>) -> Self {
        HandlerError::Retryable(message.into())
    }

    /// Creates a non-retryable failure.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        HandlerError::NonRetryable(message.into())
    }

    /// Returns true if the delivery should be rescheduled.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retryable(_))
    }
}

// A failed or timed-out publish is reported as retryable so the bus
// redelivers the triggering message and the whole decision runs again.
impl From<BusError> for HandlerError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Serialization(e) => HandlerError::NonRetryable(e.to_string()),
            other => HandlerError::Retryable(other.to_string()),
        }
    }
}
