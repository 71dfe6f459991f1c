//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::Money;
use inventory::{InventoryLedger, ProductRecord};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub available_quantity: u32,
}

impl From<ProductRecord> for ProductResponse {
    fn from(record: ProductRecord) -> Self {
        Self {
            product_id: record.id.to_string(),
            name: record.name,
            unit_price_cents: record.unit_price.cents(),
            available_quantity: record.available_quantity,
        }
    }
}

/// POST /products — adds a product to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    let unit_price = Money::from_cents(req.unit_price_cents);
    if !unit_price.is_positive() {
        return Err(ApiError::BadRequest("unit price must be positive".into()));
    }

    let record = state.ledger.create(req.name, unit_price, req.quantity).await;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /products — the full catalog with current availability.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<ProductResponse>> {
    let products = state
        .ledger
        .list()
        .await
        .into_iter()
        .map(ProductResponse::from)
        .collect();
    Json(products)
}
