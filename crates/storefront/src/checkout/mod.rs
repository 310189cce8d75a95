//! Checkout and fulfillment pipeline.
//!
//! A checkout moves through four stages:
//!
//! ```text
//! Validating -> Priced -> Persisted -> CarrierSubmitted | CarrierDeferred
//! ```
//!
//! Everything before `Persisted` fails closed with a [`CheckoutError`] and
//! leaves no trace. Everything after it (carrier submission, notifications)
//! is best-effort and never reverses the order.
//!
//! The pure pieces ([`parcel`], [`pricing`], [`shipping`] and the computation
//! half of [`discount`]) do no I/O. I/O goes through the traits in [`store`],
//! [`address`] and [`crate::carrier`] so the orchestrator can be driven with
//! in-memory collaborators.

pub mod address;
pub mod discount;
pub mod orchestrator;
pub mod parcel;
pub mod pricing;
pub mod request;
pub mod shipping;
pub mod store;

use souk_core::ProductId;
use thiserror::Error;

use crate::db::RepositoryError;

pub use address::{
    AddressResolver, DestinationSource, LocationCache, ResolvedDesk, ResolvedDestination,
};
pub use discount::{AppliedDiscount, DiscountEngine, DiscountError, DiscountValidation};
pub use orchestrator::{
    CheckoutCollaborators, CheckoutOutcome, CheckoutReceipt, CheckoutService, CheckoutSettings,
    CheckoutStage, ShippingQuote,
};
pub use parcel::{Parcel, ParcelOverride};
pub use pricing::PriceBreakdown;
pub use request::{CheckoutRequest, DeliveryTarget, PromoPreviewRequest, QuoteRequest};
pub use store::{CatalogReader, CreateOrderError, OrderStore, PromotionStore, ShippingRates};

/// Fatal checkout failures.
///
/// All of these abort before the order transaction commits, so none leaves
/// partial state behind.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed or incomplete input.
    #[error("{0}")]
    Validation(String),

    /// The destination (region, sub-region or desk) could not be resolved.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// The cart references products that are missing, inactive, unpriced, or
    /// whose price changed since the cart was built.
    #[error("cart is out of date for {} product(s)", .0.len())]
    CatalogMismatch(Vec<ProductId>),

    /// The promotional code failed validation.
    #[error("promotional code rejected: {0}")]
    PromoCodeRejected(#[from] DiscountError),

    /// The order transaction could not complete.
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl CheckoutError {
    /// Stable machine-readable error code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidDestination(_) => "INVALID_DESTINATION",
            Self::CatalogMismatch(_) => "CATALOG_MISMATCH",
            Self::PromoCodeRejected(_) => "PROMO_CODE_REJECTED",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CheckoutError::Validation("x".into()).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            CheckoutError::CatalogMismatch(vec![ProductId::new(3)]).code(),
            "CATALOG_MISMATCH"
        );
        assert_eq!(
            CheckoutError::from(DiscountError::CodeExpired).code(),
            "PROMO_CODE_REJECTED"
        );
    }

    #[test]
    fn test_catalog_mismatch_display_counts_products() {
        let err = CheckoutError::CatalogMismatch(vec![ProductId::new(1), ProductId::new(2)]);
        assert_eq!(err.to_string(), "cart is out of date for 2 product(s)");
    }
}
