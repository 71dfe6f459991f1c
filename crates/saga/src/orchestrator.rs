//! The saga orchestrator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bus::{
    BusError, Envelope, HandlerError, MarkOutcome, MessageBus, MessageHandler,
    ProcessedMessageStore, publish_with_timeout,
};
use common::OrderId;
use messages::channels::{
    ORDERS_COMMANDS, ORDERS_EVENTS, PAYMENTS_COMMANDS, PAYMENTS_EVENTS, PRODUCTS_COMMANDS,
    PRODUCTS_EVENTS,
};
use messages::{OrderCommand, OrderEvent, PaymentCommand, PaymentEvent, ProductCommand, ProductEvent};
use orders::{OrderStatus, OrderStore};

/// Reacts to every saga event with the next command.
///
/// Each reaction is a stateless decision over the incoming event alone;
/// which event arrives is the saga state. If publishing the outgoing command
/// fails, the triggering event is reported as a retryable failure so the bus
/// redelivers it and the whole decision runs again; no local compensation is
/// attempted.
pub struct SagaOrchestrator<S, B> {
    store: S,
    bus: B,
    guard: Arc<dyn ProcessedMessageStore>,
    publish_timeout: Duration,
}

impl<S, B> SagaOrchestrator<S, B>
where
    S: OrderStore,
    B: MessageBus,
{
    /// Creates the orchestrator with its injected collaborators.
    pub fn new(
        store: S,
        bus: B,
        guard: Arc<dyn ProcessedMessageStore>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            guard,
            publish_timeout,
        }
    }

    async fn dispatch(
        &self,
        channel: &'static str,
        order_id: OrderId,
        command_type: &'static str,
        payload: &impl serde::Serialize,
    ) -> Result<(), HandlerError> {
        let envelope = Envelope::new(order_id.to_string(), command_type, payload)?;
        publish_with_timeout(&self.bus, channel, envelope, self.publish_timeout).await?;
        metrics::counter!("saga_commands_dispatched_total", "command" => command_type)
            .increment(1);
        tracing::info!(%order_id, command = command_type, channel, "command dispatched");
        Ok(())
    }

    #[tracing::instrument(skip(self, event), fields(event = event.event_type()))]
    async fn on_order_event(&self, event: OrderEvent) -> Result<(), HandlerError> {
        match event {
            OrderEvent::OrderCreated(data) => {
                let command =
                    ProductCommand::reserve_product(data.order_id, data.product_id, data.quantity);
                self.dispatch(
                    PRODUCTS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
                self.store
                    .append_history(data.order_id, OrderStatus::Created)
                    .await;
            }
            OrderEvent::OrderApproved(data) => {
                self.store
                    .append_history(data.order_id, OrderStatus::Approved)
                    .await;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, event), fields(event = event.event_type()))]
    async fn on_product_event(&self, event: ProductEvent) -> Result<(), HandlerError> {
        match event {
            ProductEvent::ProductReserved(data) => {
                let command = PaymentCommand::process_payment(
                    data.order_id,
                    data.product_id,
                    data.unit_price,
                    data.quantity,
                );
                self.dispatch(
                    PAYMENTS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
            }
            ProductEvent::ProductReservationFailed(data) => {
                let command = OrderCommand::reject_order(data.order_id);
                self.dispatch(
                    ORDERS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
                self.store
                    .append_history(data.order_id, OrderStatus::Rejected)
                    .await;
            }
            ProductEvent::ProductReservationCancelled(data) => {
                let command = OrderCommand::reject_order(data.order_id);
                self.dispatch(
                    ORDERS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
                self.store
                    .append_history(data.order_id, OrderStatus::Rejected)
                    .await;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, event), fields(event = event.event_type()))]
    async fn on_payment_event(&self, event: PaymentEvent) -> Result<(), HandlerError> {
        match event {
            PaymentEvent::PaymentProcessed(data) => {
                let command = OrderCommand::approve_order(data.order_id);
                self.dispatch(
                    ORDERS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
            }
            PaymentEvent::PaymentFailed(data) => {
                let command = ProductCommand::cancel_product_reservation(
                    data.order_id,
                    data.product_id,
                    data.quantity,
                );
                self.dispatch(
                    PRODUCTS_COMMANDS,
                    data.order_id,
                    command.command_type(),
                    &command,
                )
                .await?;
            }
        }
        Ok(())
    }
}

impl<S, B> SagaOrchestrator<S, B>
where
    S: OrderStore + 'static,
    B: MessageBus + Clone + 'static,
{
    /// Subscribes this orchestrator to all three event channels.
    pub async fn subscribe_to_events(self: Arc<Self>) -> Result<(), BusError> {
        let bus = self.bus.clone();
        bus.subscribe(ORDERS_EVENTS, Arc::clone(&self) as Arc<dyn MessageHandler>)
            .await?;
        bus.subscribe(PRODUCTS_EVENTS, Arc::clone(&self) as Arc<dyn MessageHandler>)
            .await?;
        bus.subscribe(PAYMENTS_EVENTS, self as Arc<dyn MessageHandler>)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S, B> MessageHandler for SagaOrchestrator<S, B>
where
    S: OrderStore,
    B: MessageBus,
{
    async fn handle(&self, channel: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let message_id = envelope.message_id.ok_or_else(|| {
            HandlerError::non_retryable("message id header missing, cannot deduplicate")
        })?;

        if self.guard.already_processed(message_id).await {
            tracing::info!(%message_id, "duplicate event, skipping");
            return Ok(());
        }

        let malformed =
            |e: serde_json::Error| HandlerError::non_retryable(format!("malformed payload: {e}"));

        match channel {
            ORDERS_EVENTS => {
                let event: OrderEvent =
                    serde_json::from_value(envelope.payload.clone()).map_err(malformed)?;
                self.on_order_event(event).await?;
            }
            PRODUCTS_EVENTS => {
                let event: ProductEvent =
                    serde_json::from_value(envelope.payload.clone()).map_err(malformed)?;
                self.on_product_event(event).await?;
            }
            PAYMENTS_EVENTS => {
                let event: PaymentEvent =
                    serde_json::from_value(envelope.payload.clone()).map_err(malformed)?;
                self.on_payment_event(event).await?;
            }
            other => {
                return Err(HandlerError::non_retryable(format!(
                    "unexpected channel '{other}'"
                )));
            }
        }

        if self.guard.mark_processed(message_id).await == MarkOutcome::AlreadyProcessed {
            tracing::warn!(%message_id, "lost idempotency race after dispatch");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use bus::{InMemoryMessageBus, InMemoryProcessedMessageStore, RetryPolicy};
    use common::{CustomerId, Money, PaymentId, ProductId};
    use orders::{InMemoryOrderStore, Order};

    /// Captures raw envelopes from a command channel.
    struct Probe {
        seen: Arc<Mutex<Vec<Envelope>>>,
    }

    #[async_trait]
    impl MessageHandler for Probe {
        async fn handle(&self, _channel: &str, envelope: &Envelope) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    struct Harness {
        orchestrator: Arc<SagaOrchestrator<InMemoryOrderStore, InMemoryMessageBus>>,
        store: InMemoryOrderStore,
        bus: InMemoryMessageBus,
        product_commands: Arc<Mutex<Vec<Envelope>>>,
        payment_commands: Arc<Mutex<Vec<Envelope>>>,
        order_commands: Arc<Mutex<Vec<Envelope>>>,
    }

    async fn probe(bus: &InMemoryMessageBus, channel: &str) -> Arc<Mutex<Vec<Envelope>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            channel,
            Arc::new(Probe {
                seen: Arc::clone(&seen),
            }),
        )
        .await
        .unwrap();
        seen
    }

    async fn setup() -> Harness {
        let bus =
            InMemoryMessageBus::with_config(4, RetryPolicy::new(Duration::from_millis(1), 4));
        let store = InMemoryOrderStore::new();
        let orchestrator = Arc::new(SagaOrchestrator::new(
            store.clone(),
            bus.clone(),
            Arc::new(InMemoryProcessedMessageStore::new()),
            Duration::from_secs(1),
        ));

        Harness {
            orchestrator,
            store: store.clone(),
            product_commands: probe(&bus, PRODUCTS_COMMANDS).await,
            payment_commands: probe(&bus, PAYMENTS_COMMANDS).await,
            order_commands: probe(&bus, ORDERS_COMMANDS).await,
            bus,
        }
    }

    fn event_envelope(order_id: OrderId, event_type: &str, payload: &impl serde::Serialize) -> Envelope {
        Envelope::new(order_id.to_string(), event_type, payload).unwrap()
    }

    #[tokio::test]
    async fn order_created_dispatches_reserve_and_records_created() {
        let harness = setup().await;
        let order = Order::new(CustomerId::new(), ProductId::new(), 3);
        harness.store.create(order.clone()).await;

        let event =
            OrderEvent::order_created(order.id, order.customer_id, order.product_id, 3);
        harness
            .orchestrator
            .handle(ORDERS_EVENTS, &event_envelope(order.id, event.event_type(), &event))
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.product_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: ProductCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        match command {
            ProductCommand::ReserveProduct(data) => {
                assert_eq!(data.order_id, order.id);
                assert_eq!(data.quantity, 3);
            }
            other => panic!("expected ReserveProduct, got {other:?}"),
        }
        drop(commands);

        let history = harness.store.history(order.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn product_reserved_dispatches_process_payment() {
        let harness = setup().await;
        let order_id = OrderId::new();
        let product_id = ProductId::new();

        let event =
            ProductEvent::product_reserved(order_id, product_id, Money::from_cents(1000), 3);
        harness
            .orchestrator
            .handle(
                PRODUCTS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.payment_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: PaymentCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        let PaymentCommand::ProcessPayment(data) = command;
        assert_eq!(data.order_id, order_id);
        assert_eq!(data.unit_price, Money::from_cents(1000));
        assert_eq!(data.quantity, 3);
    }

    #[tokio::test]
    async fn reservation_failed_dispatches_reject_and_records_rejected() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = ProductEvent::product_reservation_failed(order_id, ProductId::new(), 3);
        harness
            .orchestrator
            .handle(
                PRODUCTS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.order_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: OrderCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        assert!(matches!(command, OrderCommand::RejectOrder(_)));
        drop(commands);

        let history = harness.store.history(order_id).await;
        assert_eq!(history.last().unwrap().status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn payment_processed_dispatches_approve() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = PaymentEvent::payment_processed(order_id, PaymentId::new());
        harness
            .orchestrator
            .handle(
                PAYMENTS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.order_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: OrderCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        assert!(matches!(command, OrderCommand::ApproveOrder(_)));
    }

    #[tokio::test]
    async fn payment_failed_dispatches_compensating_cancel() {
        let harness = setup().await;
        let order_id = OrderId::new();
        let product_id = ProductId::new();

        let event = PaymentEvent::payment_failed(order_id, product_id, 3);
        harness
            .orchestrator
            .handle(
                PAYMENTS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.product_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: ProductCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        match command {
            ProductCommand::CancelProductReservation(data) => {
                assert_eq!(data.order_id, order_id);
                assert_eq!(data.product_id, product_id);
                assert_eq!(data.quantity, 3);
            }
            other => panic!("expected CancelProductReservation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reservation_cancelled_dispatches_reject_and_records_rejected() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = ProductEvent::product_reservation_cancelled(order_id, ProductId::new());
        harness
            .orchestrator
            .handle(
                PRODUCTS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);

        let commands = harness.order_commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command: OrderCommand = serde_json::from_value(commands[0].payload.clone()).unwrap();
        assert!(matches!(command, OrderCommand::RejectOrder(_)));
        drop(commands);

        let history = harness.store.history(order_id).await;
        assert_eq!(history.last().unwrap().status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn order_approved_records_history_and_dispatches_nothing() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = OrderEvent::order_approved(order_id);
        harness
            .orchestrator
            .handle(
                ORDERS_EVENTS,
                &event_envelope(order_id, event.event_type(), &event),
            )
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);
        assert!(harness.order_commands.lock().unwrap().is_empty());
        assert!(harness.product_commands.lock().unwrap().is_empty());
        assert!(harness.payment_commands.lock().unwrap().is_empty());

        let history = harness.store.history(order_id).await;
        assert_eq!(history.last().unwrap().status, OrderStatus::Approved);
    }

    #[tokio::test]
    async fn duplicate_event_dispatches_no_second_command() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = PaymentEvent::payment_processed(order_id, PaymentId::new());
        let envelope = event_envelope(order_id, event.event_type(), &event);

        harness
            .orchestrator
            .handle(PAYMENTS_EVENTS, &envelope)
            .await
            .unwrap();
        harness
            .orchestrator
            .handle(PAYMENTS_EVENTS, &envelope)
            .await
            .unwrap();

        assert!(harness.bus.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(harness.order_commands.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_message_id_is_non_retryable() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = PaymentEvent::payment_processed(order_id, PaymentId::new());
        let envelope = event_envelope(order_id, event.event_type(), &event).without_message_id();

        let err = harness
            .orchestrator
            .handle(PAYMENTS_EVENTS, &envelope)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(harness.order_commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unexpected_channel_is_non_retryable() {
        let harness = setup().await;
        let order_id = OrderId::new();

        let event = PaymentEvent::payment_processed(order_id, PaymentId::new());
        let envelope = event_envelope(order_id, event.event_type(), &event);

        let err = harness
            .orchestrator
            .handle("unknown-channel", &envelope)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
