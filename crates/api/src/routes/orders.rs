//! Order placement and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub status: String,
}

#[derive(Serialize)]
pub struct OrderHistoryResponse {
    pub order_id: String,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

// -- Handlers --

/// POST /orders — accepts an order for processing.
///
/// Returns 202: the caller learns the order was accepted, not that it was
/// fulfilled. The saga's outcome is observable through the order and
/// history reads.
#[tracing::instrument(skip(state, req))]
pub async fn place(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be positive".into()));
    }
    let customer_id = CustomerId::from_uuid(parse_uuid(&req.customer_id, "customer_id")?);
    let product_id = ProductId::from_uuid(parse_uuid(&req.product_id, "product_id")?);

    let order = state
        .orders
        .place_order(customer_id, product_id, req.quantity)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(OrderResponse {
            order_id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            product_id: order.product_id.to_string(),
            quantity: order.quantity,
            status: order.status.to_string(),
        }),
    ))
}

/// GET /orders/:id — current order state.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id, "order id")?);
    let order = state
        .orders
        .find(order_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(OrderResponse {
        order_id: order.id.to_string(),
        customer_id: order.customer_id.to_string(),
        product_id: order.product_id.to_string(),
        quantity: order.quantity,
        status: order.status.to_string(),
    }))
}

/// GET /orders/:id/history — the order's status transitions in append order.
#[tracing::instrument(skip(state))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderHistoryResponse>>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id, "order id")?);
    let entries = state
        .orders
        .history(order_id)
        .await
        .into_iter()
        .map(|entry| OrderHistoryResponse {
            order_id: entry.order_id.to_string(),
            status: entry.status.to_string(),
            recorded_at: entry.recorded_at,
        })
        .collect();

    Ok(Json(entries))
}

fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {field}: {e}")))
}
