//! Consumer for the payments command channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bus::{
    Envelope, HandlerError, MarkOutcome, MessageBus, MessageHandler, ProcessedMessageStore,
    publish_with_timeout,
};
use common::OrderId;
use messages::channels::PAYMENTS_EVENTS;
use messages::{PaymentCommand, PaymentEvent, ProcessPaymentData};

use crate::gateway::SettlementGateway;
use crate::store::{Payment, PaymentStore};

/// Handles `ProcessPayment`.
///
/// The settlement call is the one blocking external operation in this
/// service; it runs under a timeout, and an elapsed timeout is a retryable
/// failure. A permanent rejection publishes `PaymentFailed` before the
/// command is reported non-retryable.
pub struct PaymentsCommandHandler<G, P, B> {
    gateway: G,
    store: P,
    bus: B,
    guard: Arc<dyn ProcessedMessageStore>,
    settlement_timeout: Duration,
    publish_timeout: Duration,
}

impl<G, P, B> PaymentsCommandHandler<G, P, B>
where
    G: SettlementGateway,
    P: PaymentStore,
    B: MessageBus,
{
    /// Creates the handler with its injected collaborators.
    pub fn new(
        gateway: G,
        store: P,
        bus: B,
        guard: Arc<dyn ProcessedMessageStore>,
        settlement_timeout: Duration,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            store,
            bus,
            guard,
            settlement_timeout,
            publish_timeout,
        }
    }

    async fn publish_event(
        &self,
        order_id: OrderId,
        event: &PaymentEvent,
    ) -> Result<(), HandlerError> {
        let envelope = Envelope::new(order_id.to_string(), event.event_type(), event)?;
        publish_with_timeout(&self.bus, PAYMENTS_EVENTS, envelope, self.publish_timeout).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    async fn handle_process_payment(&self, cmd: ProcessPaymentData) -> Result<(), HandlerError> {
        // A record for this order means a prior delivery settled but did not
        // get as far as publishing; reuse it instead of charging again.
        let payment = match self.store.find_by_order(cmd.order_id).await {
            Some(existing) => {
                tracing::info!(payment_id = %existing.id, "order already settled");
                existing
            }
            None => {
                let total = cmd.unit_price.multiply(cmd.quantity);
                let payment_id =
                    match tokio::time::timeout(self.settlement_timeout, self.gateway.settle(total))
                        .await
                    {
                        Err(_) => {
                            return Err(HandlerError::retryable(format!(
                                "settlement timed out after {:?}",
                                self.settlement_timeout
                            )));
                        }
                        Ok(Err(err)) if err.is_retryable() => {
                            return Err(HandlerError::retryable(err.to_string()));
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(error = %err, "settlement rejected");
                            metrics::counter!("payments_failed_total").increment(1);
                            let event = PaymentEvent::payment_failed(
                                cmd.order_id,
                                cmd.product_id,
                                cmd.quantity,
                            );
                            self.publish_event(cmd.order_id, &event).await?;
                            return Err(HandlerError::non_retryable(err.to_string()));
                        }
                        Ok(Ok(payment_id)) => payment_id,
                    };

                metrics::counter!("payments_settled_total").increment(1);
                self.store
                    .insert(Payment {
                        id: payment_id,
                        order_id: cmd.order_id,
                        product_id: cmd.product_id,
                        unit_price: cmd.unit_price,
                        quantity: cmd.quantity,
                        total,
                    })
                    .await
            }
        };

        let event = PaymentEvent::payment_processed(cmd.order_id, payment.id);
        self.publish_event(cmd.order_id, &event).await
    }
}

#[async_trait]
impl<G, P, B> MessageHandler for PaymentsCommandHandler<G, P, B>
where
    G: SettlementGateway,
    P: PaymentStore,
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

        let command: PaymentCommand = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HandlerError::non_retryable(format!("malformed payload: {e}")))?;

        match command {
            PaymentCommand::ProcessPayment(cmd) => self.handle_process_payment(cmd).await?,
        }

        if self.guard.mark_processed(message_id).await == MarkOutcome::AlreadyProcessed {
            tracing::warn!(%message_id, "lost idempotency race after side effect");
        }
        Ok(())
    }
}
