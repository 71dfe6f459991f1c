//! HTTP entry points and wiring for the order saga services.
//!
//! Order placement and product creation come in over HTTP; everything after
//! acceptance happens asynchronously on the bus. Callers get a 202 with the
//! generated order id and observe the outcome later through the order and
//! history read endpoints.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use bus::{InMemoryMessageBus, InMemoryProcessedMessageStore, MessageBus};
use inventory::{InMemoryInventoryLedger, ProductCommandsHandler};
use messages::channels::{ORDERS_COMMANDS, PAYMENTS_COMMANDS, PRODUCTS_COMMANDS};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{InMemoryOrderStore, OrderService, OrdersCommandHandler};
use payments::{InMemoryPaymentStore, InMemorySettlementGateway, PaymentsCommandHandler};
use saga::SagaOrchestrator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub bus: InMemoryMessageBus,
    pub orders: Arc<OrderService<InMemoryOrderStore, InMemoryMessageBus>>,
    pub ledger: InMemoryInventoryLedger,
    pub payments: InMemoryPaymentStore,
    pub settlement: InMemorySettlementGateway,
}

/// Wires every service onto one bus and subscribes all consumers.
///
/// Each service gets its own idempotency guard; nothing is shared except
/// the bus itself.
pub async fn create_state(config: &Config) -> Arc<AppState> {
    let bus = InMemoryMessageBus::with_config(config.bus_partitions, config.retry_policy());

    let order_store = InMemoryOrderStore::new();
    let orders = Arc::new(OrderService::new(
        order_store.clone(),
        bus.clone(),
        config.publish_timeout(),
    ));
    bus.subscribe(
        ORDERS_COMMANDS,
        Arc::new(OrdersCommandHandler::new(
            Arc::clone(&orders),
            Arc::new(InMemoryProcessedMessageStore::new()),
        )),
    )
    .await
    .expect("orders command channel double-subscribed");

    let ledger = InMemoryInventoryLedger::new();
    bus.subscribe(
        PRODUCTS_COMMANDS,
        Arc::new(ProductCommandsHandler::new(
            ledger.clone(),
            bus.clone(),
            Arc::new(InMemoryProcessedMessageStore::new()),
            config.publish_timeout(),
        )),
    )
    .await
    .expect("products command channel double-subscribed");

    let settlement = InMemorySettlementGateway::new();
    let payments = InMemoryPaymentStore::new();
    bus.subscribe(
        PAYMENTS_COMMANDS,
        Arc::new(PaymentsCommandHandler::new(
            settlement.clone(),
            payments.clone(),
            bus.clone(),
            Arc::new(InMemoryProcessedMessageStore::new()),
            config.settlement_timeout(),
            config.publish_timeout(),
        )),
    )
    .await
    .expect("payments command channel double-subscribed");

    let orchestrator = Arc::new(SagaOrchestrator::new(
        order_store,
        bus.clone(),
        Arc::new(InMemoryProcessedMessageStore::new()),
        config.publish_timeout(),
    ));
    orchestrator
        .subscribe_to_events()
        .await
        .expect("event channel double-subscribed");

    Arc::new(AppState {
        bus,
        orders,
        ledger,
        payments,
        settlement,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/history", get(routes::orders::history))
        .route("/products", post(routes::products::create))
        .route("/products", get(routes::products::list))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
