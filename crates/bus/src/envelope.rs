//! The unit of transfer on the bus.

use common::MessageId;
use serde::Serialize;

use crate::error::BusError;

/// A message as it travels over a channel.
///
/// The payload is carried as JSON; the message type names the payload for
/// logging and dead-letter diagnostics. The routing key determines the
/// partition, so messages sharing a key are delivered in publish order.
/// The message identifier is an application-supplied header; a missing one
/// means the receiving handler cannot deduplicate and must refuse the
/// message.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Unique identifier for this logical message.
    pub message_id: Option<MessageId>,
    /// Partitioning key; order id for all saga traffic.
    pub routing_key: String,
    /// Name of the payload type.
    pub message_type: String,
    /// The serialized payload.
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Creates an envelope with a fresh message identifier.
    pub fn new<T: Serialize>(
        routing_key: impl Into<String>,
        message_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, BusError> {
        Ok(Self {
            message_id: Some(MessageId::new()),
            routing_key: routing_key.into(),
            message_type: message_type.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Replaces the message identifier. Used when redriving a message whose
    /// identity must be preserved, and by tests exercising redelivery.
    pub fn with_message_id(mut self, message_id: MessageId) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Strips the message identifier header.
    pub fn without_message_id(mut self) -> Self {
        self.message_id = None;
        self
    }
}
