//! Souk Core - Shared types library.
//!
//! This crate provides common types used across all Souk components:
//! - `storefront` - Checkout and fulfillment service
//! - `cli` - Command-line tools for migrations, seeding and promotions
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, phones, promo codes and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
