//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Authenticated user (trusted gateway header to request extension)
//! 5. Rate limiting (governor, checkout endpoints only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthenticatedUser, OptionalUser, USER_ID_HEADER, authenticated_user_middleware};
pub use rate_limit::{api_rate_limiter, checkout_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
