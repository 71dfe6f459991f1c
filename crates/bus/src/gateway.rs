//! The bus gateway traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::{BusError, HandlerError};

/// Publish/subscribe over named channels.
///
/// Implementations provide at-least-once delivery and preserve ordering for
/// envelopes sharing a routing key. Each channel is consumed by a single
/// subscriber.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes an envelope to a channel.
    async fn publish(&self, channel: &str, envelope: Envelope) -> Result<(), BusError>;

    /// Registers the handler that consumes a channel.
    async fn subscribe(
        &self,
        channel: &str,
        handler: std::sync::Arc<dyn MessageHandler>,
    ) -> Result<(), BusError>;
}

/// A message consumer.
///
/// The returned error's variant decides redelivery: `Retryable` reschedules
/// the delivery with backoff, `NonRetryable` dead-letters the envelope.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, channel: &str, envelope: &Envelope) -> Result<(), HandlerError>;
}

/// Publishes with an upper bound on how long the call may block.
///
/// An elapsed timeout is reported as `BusError::PublishTimeout`, which
/// callers classify as retryable.
pub async fn publish_with_timeout<B: MessageBus + ?Sized>(
    bus: &B,
    channel: &str,
    envelope: Envelope,
    timeout: Duration,
) -> Result<(), BusError> {
    match tokio::time::timeout(timeout, bus.publish(channel, envelope)).await {
        Ok(result) => result,
        Err(_) => Err(BusError::PublishTimeout {
            channel: channel.to_string(),
            timeout,
        }),
    }
}
