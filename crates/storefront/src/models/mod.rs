//! Domain models for storefront.
//!
//! Row types derive `sqlx::FromRow` where the table maps one-to-one;
//! otherwise repositories convert rows into these types.

pub mod cart;
pub mod location;
pub mod order;
pub mod promotion;

pub use cart::{CartLine, CatalogProduct};
pub use location::{
    Desk, DeskSeed, LocationSeed, RateSeed, Region, RegionSeed, SeedCounts, ShippingRate,
    SubRegion, SubRegionSeed,
};
pub use order::{CustomerSnapshot, NewOrder, OrderSummary, PersistedOrder};
pub use promotion::{DiscountKind, Eligibility, NewPromoCode, PromotionalCode};
