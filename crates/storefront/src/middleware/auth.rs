//! Authenticated user propagation.
//!
//! Authentication itself happens upstream. The gateway in front of the
//! storefront forwards the signed-in user's id in [`USER_ID_HEADER`]; the
//! middleware turns it into an [`AuthenticatedUser`] request extension and
//! handlers read it with the [`OptionalUser`] extractor. No header means a
//! guest checkout.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use souk_core::UserId;
use tracing::Span;

use crate::error::set_sentry_user;

/// Header carrying the authenticated user id from the gateway.
pub const USER_ID_HEADER: &str = "x-souk-user-id";

/// The user that owns the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// Middleware that records the gateway-supplied user on the request.
///
/// Unparseable ids are ignored and the request proceeds as a guest.
pub async fn authenticated_user_middleware(mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i32>().ok())
        .map(UserId::new);

    if let Some(user_id) = user {
        Span::current().record("user_id", user_id.as_i32());
        set_sentry_user(user_id);
        request.extensions_mut().insert(AuthenticatedUser(user_id));
    }

    next.run(request).await
}

/// Extractor that optionally gets the current user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalUser(user): OptionalUser) -> impl IntoResponse {
///     match user {
///         Some(id) => format!("Hello, user {id}!"),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalUser(pub Option<UserId>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.0),
        ))
    }
}
