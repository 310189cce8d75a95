//! Order domain types.
//!
//! An order is written once, atomically, together with its line snapshots and
//! its carrier shipment record. Later changes only touch status and the
//! shipment's carrier fields.

use chrono::{DateTime, Utc};
use serde::Serialize;
use souk_core::{
    Cents, CurrencyCode, OrderId, OrderStatus, Phone, ShipmentId, ShipmentStatus, UserId,
};

use super::cart::CartLine;
use crate::checkout::address::ResolvedDestination;
use crate::checkout::discount::AppliedDiscount;
use crate::checkout::parcel::Parcel;
use crate::checkout::pricing::PriceBreakdown;

/// Customer identity captured at order time.
///
/// Independent of any later profile edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
}

impl CustomerSnapshot {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Everything needed to write an order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Prefix for the generated order number.
    pub number_prefix: String,
    /// Owning user, `None` for guest checkout.
    pub user_id: Option<UserId>,
    pub customer: CustomerSnapshot,
    pub notes: Option<String>,
    pub currency: CurrencyCode,
    pub pricing: PriceBreakdown,
    pub lines: Vec<CartLine>,
    pub destination: ResolvedDestination,
    pub parcel: Parcel,
    /// Carrier flag: shipping fee billed to the merchant.
    pub free_shipping: bool,
    /// Code usage to record alongside the order.
    pub promotion: Option<AppliedDiscount>,
}

/// Identifiers of a freshly written order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub shipment_id: ShipmentId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Order status and carrier state for the confirmation page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub shipping_cents: Cents,
    pub total_cents: Cents,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub shipment_status: ShipmentStatus,
    pub tracking: Option<String>,
    pub label_url: Option<String>,
}

/// Width of the zero-padded running number in an order number.
pub const ORDER_NUMBER_DIGITS: usize = 6;

/// Format an order number, e.g. `COD-000042`.
#[must_use]
pub fn format_order_number(prefix: &str, running_number: i64) -> String {
    format!("{prefix}-{running_number:0width$}", width = ORDER_NUMBER_DIGITS)
}
