//! Souk Storefront library.
//!
//! Cash-on-delivery checkout and fulfillment: address resolution, parcel
//! packing, discounts, pricing, atomic order persistence and carrier
//! hand-off, exposed as a library so it can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod carrier;
pub mod checkout;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
