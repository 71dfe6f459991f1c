//! Consumer for the products command channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bus::{
    Envelope, HandlerError, MarkOutcome, MessageBus, MessageHandler, ProcessedMessageStore,
    publish_with_timeout,
};
use common::OrderId;
use messages::channels::PRODUCTS_EVENTS;
use messages::{
    CancelProductReservationData, ProductCommand, ProductEvent, ReserveProductData,
};

use crate::ledger::InventoryLedger;

/// Handles `ReserveProduct` and `CancelProductReservation`.
///
/// Every command is answered with an event on the products event channel,
/// so the saga always observes an outcome. A reservation that cannot be
/// satisfied publishes `ProductReservationFailed` before the command itself
/// is reported non-retryable and dead-lettered.
pub struct ProductCommandsHandler<L, B> {
    ledger: L,
    bus: B,
    guard: Arc<dyn ProcessedMessageStore>,
    publish_timeout: Duration,
}

impl<L, B> ProductCommandsHandler<L, B>
where
    L: InventoryLedger,
    B: MessageBus,
{
    /// Creates the handler with its injected collaborators.
    pub fn new(
        ledger: L,
        bus: B,
        guard: Arc<dyn ProcessedMessageStore>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            bus,
            guard,
            publish_timeout,
        }
    }

    async fn publish_event(
        &self,
        order_id: OrderId,
        event: &ProductEvent,
    ) -> Result<(), HandlerError> {
        let envelope = Envelope::new(order_id.to_string(), event.event_type(), event)?;
        publish_with_timeout(&self.bus, PRODUCTS_EVENTS, envelope, self.publish_timeout).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, product_id = %cmd.product_id))]
    async fn handle_reserve(&self, cmd: ReserveProductData) -> Result<(), HandlerError> {
        match self
            .ledger
            .reserve(cmd.product_id, cmd.quantity, cmd.order_id)
            .await
        {
            Ok(product) => {
                let event = ProductEvent::product_reserved(
                    cmd.order_id,
                    cmd.product_id,
                    product.unit_price,
                    cmd.quantity,
                );
                self.publish_event(cmd.order_id, &event).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "reservation failed");
                let event = ProductEvent::product_reservation_failed(
                    cmd.order_id,
                    cmd.product_id,
                    cmd.quantity,
                );
                self.publish_event(cmd.order_id, &event).await?;
                Err(HandlerError::non_retryable(err.to_string()))
            }
        }
    }

    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, product_id = %cmd.product_id))]
    async fn handle_cancel(&self, cmd: CancelProductReservationData) -> Result<(), HandlerError> {
        self.ledger
            .release(cmd.product_id, cmd.quantity, cmd.order_id)
            .await
            .map_err(|err| HandlerError::non_retryable(err.to_string()))?;

        let event = ProductEvent::product_reservation_cancelled(cmd.order_id, cmd.product_id);
        self.publish_event(cmd.order_id, &event).await
    }
}

#[async_trait]
impl<L, B> MessageHandler for ProductCommandsHandler<L, B>
where
    L: InventoryLedger,
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

        let command: ProductCommand = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HandlerError::non_retryable(format!("malformed payload: {e}")))?;

        match command {
            ProductCommand::ReserveProduct(cmd) => self.handle_reserve(cmd).await?,
            ProductCommand::CancelProductReservation(cmd) => self.handle_cancel(cmd).await?,
        }

        if self.guard.mark_processed(message_id).await == MarkOutcome::AlreadyProcessed {
            tracing::warn!(%message_id, "lost idempotency race after side effect");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use bus::{InMemoryMessageBus, InMemoryProcessedMessageStore, RetryPolicy};
    use common::{MessageId, Money};
    use messages::channels::PRODUCTS_COMMANDS;

    use crate::ledger::InMemoryInventoryLedger;

    struct Collector {
        events: Arc<Mutex<Vec<ProductEvent>>>,
    }

    #[async_trait]
    impl MessageHandler for Collector {
        async fn handle(&self, _channel: &str, envelope: &Envelope) -> Result<(), HandlerError> {
            let event: ProductEvent = serde_json::from_value(envelope.payload.clone())
                .map_err(|e| HandlerError::non_retryable(e.to_string()))?;
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    async fn setup(
        stock: u32,
    ) -> (
        Arc<ProductCommandsHandler<InMemoryInventoryLedger, InMemoryMessageBus>>,
        InMemoryInventoryLedger,
        InMemoryMessageBus,
        common::ProductId,
        Arc<Mutex<Vec<ProductEvent>>>,
    ) {
        let bus =
            InMemoryMessageBus::with_config(4, RetryPolicy::new(Duration::from_millis(1), 4));
        let ledger = InMemoryInventoryLedger::new();
        let product = ledger
            .create("Widget".to_string(), Money::from_cents(1000), stock)
            .await;

        let events = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            PRODUCTS_EVENTS,
            Arc::new(Collector {
                events: Arc::clone(&events),
            }),
        )
        .await
        .unwrap();

        let handler = Arc::new(ProductCommandsHandler::new(
            ledger.clone(),
            bus.clone(),
            Arc::new(InMemoryProcessedMessageStore::new()),
            Duration::from_secs(1),
        ));

        (handler, ledger, bus, product.id, events)
    }

    fn command_envelope(command: &ProductCommand, order_id: OrderId) -> Envelope {
        Envelope::new(order_id.to_string(), command.command_type(), command).unwrap()
    }

    #[tokio::test]
    async fn reserve_publishes_product_reserved() {
        let (handler, ledger, bus, product_id, events) = setup(5).await;
        let order_id = OrderId::new();
        let command = ProductCommand::reserve_product(order_id, product_id, 3);

        handler
            .handle(PRODUCTS_COMMANDS, &command_envelope(&command, order_id))
            .await
            .unwrap();

        assert!(bus.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(ledger.available(product_id), Some(2));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ProductEvent::ProductReserved(data) => {
                assert_eq!(data.order_id, order_id);
                assert_eq!(data.unit_price, Money::from_cents(1000));
                assert_eq!(data.quantity, 3);
            }
            other => panic!("expected ProductReserved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insufficient_stock_publishes_failure_and_reports_non_retryable() {
        let (handler, ledger, bus, product_id, events) = setup(2).await;
        let order_id = OrderId::new();
        let command = ProductCommand::reserve_product(order_id, product_id, 3);

        let err = handler
            .handle(PRODUCTS_COMMANDS, &command_envelope(&command, order_id))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());

        assert!(bus.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(ledger.available(product_id), Some(2));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ProductEvent::ProductReservationFailed(_)
        ));
    }

    #[tokio::test]
    async fn cancel_releases_and_publishes_cancelled() {
        let (handler, ledger, bus, product_id, events) = setup(5).await;
        let order_id = OrderId::new();

        let reserve = ProductCommand::reserve_product(order_id, product_id, 3);
        handler
            .handle(PRODUCTS_COMMANDS, &command_envelope(&reserve, order_id))
            .await
            .unwrap();

        let cancel = ProductCommand::cancel_product_reservation(order_id, product_id, 3);
        handler
            .handle(PRODUCTS_COMMANDS, &command_envelope(&cancel, order_id))
            .await
            .unwrap();

        assert!(bus.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(ledger.available(product_id), Some(5));

        let events = events.lock().unwrap();
        assert!(matches!(
            events.last().unwrap(),
            ProductEvent::ProductReservationCancelled(_)
        ));
    }

    #[tokio::test]
    async fn duplicate_message_id_is_a_no_op() {
        let (handler, ledger, bus, product_id, events) = setup(5).await;
        let order_id = OrderId::new();
        let command = ProductCommand::reserve_product(order_id, product_id, 3);
        let envelope = command_envelope(&command, order_id);

        handler.handle(PRODUCTS_COMMANDS, &envelope).await.unwrap();
        handler.handle(PRODUCTS_COMMANDS, &envelope).await.unwrap();

        assert!(bus.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(ledger.available(product_id), Some(2));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_message_id_is_non_retryable() {
        let (handler, ledger, _bus, product_id, _events) = setup(5).await;
        let order_id = OrderId::new();
        let command = ProductCommand::reserve_product(order_id, product_id, 3);
        let envelope = command_envelope(&command, order_id).without_message_id();

        let err = handler
            .handle(PRODUCTS_COMMANDS, &envelope)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(ledger.available(product_id), Some(5));
    }

    #[tokio::test]
    async fn malformed_payload_is_non_retryable() {
        let (handler, _ledger, _bus, _product_id, _events) = setup(5).await;
        let envelope =
            Envelope::new("key", "Garbage", &serde_json::json!({ "nope": true })).unwrap();

        let err = handler
            .handle(PRODUCTS_COMMANDS, &envelope)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn replaying_reserve_with_new_id_reserves_again() {
        // Distinct message ids are distinct logical messages; only exact
        // redelivery is deduplicated.
        let (handler, ledger, _bus, product_id, _events) = setup(6).await;
        let order_id = OrderId::new();
        let command = ProductCommand::reserve_product(order_id, product_id, 3);

        handler
            .handle(PRODUCTS_COMMANDS, &command_envelope(&command, order_id))
            .await
            .unwrap();
        handler
            .handle(
                PRODUCTS_COMMANDS,
                &command_envelope(&command, order_id).with_message_id(MessageId::new()),
            )
            .await
            .unwrap();

        assert_eq!(ledger.available(product_id), Some(0));
    }
}
