//! Persistence seams used by the checkout pipeline.
//!
//! The `PostgreSQL` implementations live in [`crate::db`]; tests substitute
//! in-memory ones.

use async_trait::async_trait;
use souk_core::{OrderId, ProductId, PromoCode, PromoCodeId, UserId};
use thiserror::Error;

use super::CheckoutError;
use super::discount::DiscountError;
use crate::carrier::ShipmentUpdate;
use crate::db::RepositoryError;
use crate::models::{
    CatalogProduct, NewOrder, OrderSummary, PersistedOrder, PromotionalCode, ShippingRate,
};

/// Read-only catalog access.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Fetch the catalog entries for `ids`. Missing ids are simply absent
    /// from the result.
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CatalogProduct>, RepositoryError>;
}

/// Promotional code lookups.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Find a code by its normalized (upper-case) form.
    async fn code_by_name(
        &self,
        code: &PromoCode,
    ) -> Result<Option<PromotionalCode>, RepositoryError>;

    /// How many orders `user_id` has placed with the code.
    async fn user_usage_count(
        &self,
        code_id: PromoCodeId,
        user_id: UserId,
    ) -> Result<u32, RepositoryError>;
}

/// Per-region shipping prices.
#[async_trait]
pub trait ShippingRates: Send + Sync {
    /// Rate for the region with this name (case-insensitive).
    async fn rate_for_region(
        &self,
        region_name: &str,
    ) -> Result<Option<ShippingRate>, RepositoryError>;
}

/// Why an order could not be written.
#[derive(Debug, Error)]
pub enum CreateOrderError {
    /// Another checkout consumed the last use of the code first.
    #[error("promotional code usage limit reached")]
    PromoCodeExhausted,

    /// A concurrent order by the same user consumed their last use.
    #[error("promotional code user limit reached")]
    PromoCodeUserLimit,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CreateOrderError> for CheckoutError {
    fn from(e: CreateOrderError) -> Self {
        match e {
            CreateOrderError::PromoCodeExhausted => {
                Self::PromoCodeRejected(DiscountError::GlobalLimitReached)
            }
            CreateOrderError::PromoCodeUserLimit => {
                Self::PromoCodeRejected(DiscountError::UserLimitReached)
            }
            CreateOrderError::Repository(e) => Self::Persistence(e),
        }
    }
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write the order, its lines, its carrier shipment and the promotional
    /// code usage in one transaction. Nothing is visible unless all succeed.
    async fn create_order(&self, order: &NewOrder) -> Result<PersistedOrder, CreateOrderError>;

    /// Append a carrier attempt to the shipment's audit trail and apply its
    /// outcome. A successful submission also moves the order to `SUBMITTED`.
    async fn record_carrier_attempt(
        &self,
        order_id: OrderId,
        update: &ShipmentUpdate,
    ) -> Result<(), RepositoryError>;

    /// Status, pricing and tracking of an order by number.
    async fn order_summary(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderSummary>, RepositoryError>;
}
