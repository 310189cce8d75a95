//! Order lookup for the confirmation page.

use axum::{
    Json,
    extract::{Path, State},
};

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::OrderSummary;
use crate::state::AppState;

/// Show an order by its order number.
pub async fn show(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderSummary>>> {
    let summary = state
        .checkout()
        .order_summary(order_number.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;
    Ok(Json(ApiResponse::ok(summary)))
}
