//! Consumer for the orders command channel.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{
    Envelope, HandlerError, MarkOutcome, MessageHandler, MessageBus, ProcessedMessageStore,
};
use messages::OrderCommand;

use crate::error::OrderError;
use crate::service::OrderService;
use crate::store::OrderStore;

/// Handles `ApproveOrder` and `RejectOrder`.
///
/// A command that arrives after the order already reached a terminal state
/// is logged and dropped, never retried.
pub struct OrdersCommandHandler<S, B> {
    service: Arc<OrderService<S, B>>,
    guard: Arc<dyn ProcessedMessageStore>,
}

impl<S, B> OrdersCommandHandler<S, B>
where
    S: OrderStore,
    B: MessageBus,
{
    /// Creates the handler with its injected collaborators.
    pub fn new(service: Arc<OrderService<S, B>>, guard: Arc<dyn ProcessedMessageStore>) -> Self {
        Self { service, guard }
    }

    fn settle_outcome(result: Result<(), OrderError>) -> Result<(), HandlerError> {
        match result {
            Ok(()) => Ok(()),
            Err(OrderError::TerminalState {
                order_id,
                current,
                requested,
            }) => {
                tracing::warn!(%order_id, %current, %requested, "terminal state transition dropped");
                Ok(())
            }
            Err(OrderError::Publish(e)) => Err(e.into()),
            Err(other) => Err(HandlerError::non_retryable(other.to_string())),
        }
    }
}

#[async_trait]
impl<S, B> MessageHandler for OrdersCommandHandler<S, B>
where
    S: OrderStore,
    B: MessageBus,
{
    async fn handle(&self, _channel: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let message_id = envelope.message_id.ok_or_else(|| {
            HandlerError::non_retryable("message id header missing, cannot deduplicate")
        })?;

        if self.guard.already_processed(message_id).await {
            tracing::info!(%message_id, "duplicate command, skipping");
            return Ok(());
        }

        let command: OrderCommand = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HandlerError::non_retryable(format!("malformed payload: {e}")))?;

        match command {
            OrderCommand::ApproveOrder(cmd) => {
                Self::settle_outcome(self.service.approve_order(cmd.order_id).await)?;
            }
            OrderCommand::RejectOrder(cmd) => {
                Self::settle_outcome(self.service.reject_order(cmd.order_id).await)?;
            }
        }

        if self.guard.mark_processed(message_id).await == MarkOutcome::AlreadyProcessed {
            tracing::warn!(%message_id, "lost idempotency race after side effect");
        }
        Ok(())
    }
}
