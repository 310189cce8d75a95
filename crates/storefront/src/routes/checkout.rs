//! Checkout route handlers.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::instrument;

use super::ApiResponse;
use crate::checkout::{
    CheckoutOutcome, CheckoutRequest, DiscountValidation, PromoPreviewRequest, QuoteRequest,
    ShippingQuote,
};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalUser;
use crate::state::AppState;

/// Place a cash-on-delivery order.
///
/// Responds `ok: true` once the order is stored, even when the carrier
/// refused or never saw the parcel; `carrier.error` says why.
#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CheckoutOutcome>>> {
    let Json(request) = payload?;

    let receipt = state.checkout().submit(&request, user).await?;
    let outcome = receipt.outcome;

    let stage = outcome.stage.to_string();
    add_breadcrumb(
        "checkout",
        "Order created",
        Some(&[
            ("order_number", outcome.order_number.as_str()),
            ("stage", stage.as_str()),
        ]),
    );

    Ok(Json(ApiResponse::ok(outcome)))
}

/// Quote shipping for a cart and destination.
#[instrument(skip(state, payload))]
pub async fn quote(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ShippingQuote>>> {
    let Json(request) = payload?;
    let quote = state.checkout().quote(&request).await?;
    Ok(Json(ApiResponse::ok(quote)))
}

/// Preview a promotional code against a cart. Nothing is recorded.
///
/// An unusable code is a normal answer (`is_valid: false`), not an error.
#[instrument(skip(state, payload))]
pub async fn preview_promo(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    payload: std::result::Result<Json<PromoPreviewRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DiscountValidation>>> {
    let Json(request) = payload?;
    let validation = state.checkout().preview_code(&request, user).await?;
    Ok(Json(ApiResponse::ok(validation)))
}
