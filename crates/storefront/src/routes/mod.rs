//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Readiness check (database ping)
//!
//! # Checkout
//! POST /api/checkout                             - Place a COD order
//! POST /api/checkout/quote                       - Shipping quote for a cart and destination
//! POST /api/checkout/promo                       - Preview a promotional code
//!
//! # Locations (address form)
//! GET  /api/locations/regions                    - Active regions
//! GET  /api/locations/regions/{id}/sub-regions   - Active sub-regions of a region
//! GET  /api/locations/regions/{id}/desks         - Active pickup desks of a region
//!
//! # Orders
//! GET  /api/orders/{order_number}                - Order confirmation details
//! ```

pub mod checkout;
pub mod locations;
pub mod orders;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::from_fn,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, authenticated_user_middleware, checkout_rate_limiter, request_id_middleware,
};
use crate::state::AppState;

/// Successful JSON body: `{ "ok": true, ...payload }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let submit = Router::new()
        .route("/", post(checkout::submit))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/quote", post(checkout::quote))
        .route("/promo", post(checkout::preview_promo))
        .layer(api_rate_limiter())
        .merge(submit)
}

/// Create the location routes router.
pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/regions", get(locations::regions))
        .route("/regions/{id}/sub-regions", get(locations::sub_regions))
        .route("/regions/{id}/desks", get(locations::desks))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{order_number}", get(orders::show))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/checkout", checkout_routes())
        .nest("/api/locations", location_routes())
        .nest("/api/orders", order_routes())
}

/// Build the full application with its middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(from_fn(authenticated_user_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
