//! Customer payment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    services::payments::{CaptureResult, CreateOrderRequest, Order},
};

/// Open a payment order for a reservation or quotation code
pub async fn create_order(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.services.payments.create_order(&request.reference).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Capture after the customer approved; the gateway response decides what gets updated
pub async fn capture_order(
    State(state): State<crate::AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<CaptureResult>> {
    Ok(Json(state.services.payments.capture_order(&order_id).await?))
}
