//! Core types for Souk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod phone;
pub mod promo_code;
pub mod status;

pub use id::*;
pub use money::{Cents, CurrencyCode, MINOR_UNITS_PER_MAJOR};
pub use phone::{Phone, PhoneError};
pub use promo_code::{PromoCode, PromoCodeError};
pub use status::*;
