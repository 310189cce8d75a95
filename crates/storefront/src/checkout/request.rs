//! Inbound checkout payloads.
//!
//! Delivery is a tagged union on `mode`, so a home delivery without a
//! sub-region or a desk delivery without a desk id fails to deserialize at
//! all. The remaining checks live in the `validate` methods.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use souk_core::{Cents, DeliveryMode, DeskId, Phone, ProductId};

use super::CheckoutError;
use super::parcel::ParcelOverride;
use crate::models::CustomerSnapshot;

/// Largest quantity accepted on a single line.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Longest accepted order note, in characters.
pub const MAX_NOTES_CHARS: usize = 500;

/// One cart line as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemInput {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price the client displayed. Only used to detect stale carts.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
}

/// Destination, per delivery mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryTarget {
    Home { region: String, sub_region: String },
    Desk { region: String, desk_id: DeskId },
}

impl DeliveryTarget {
    #[must_use]
    pub fn region(&self) -> &str {
        match self {
            Self::Home { region, .. } | Self::Desk { region, .. } => region,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> DeliveryMode {
        match self {
            Self::Home { .. } => DeliveryMode::Home,
            Self::Desk { .. } => DeliveryMode::Desk,
        }
    }

    fn validate(&self) -> Result<(), CheckoutError> {
        if self.region().trim().is_empty() {
            return Err(CheckoutError::Validation("region is required".to_string()));
        }
        if let Self::Home { sub_region, .. } = self
            && sub_region.trim().is_empty()
        {
            return Err(CheckoutError::Validation(
                "sub_region is required for home delivery".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInput {
    #[serde(flatten)]
    pub target: DeliveryTarget,
    /// Ask the carrier to bill shipping to the merchant. Does not change the
    /// price charged to the customer.
    #[serde(default)]
    pub free_shipping: bool,
}

/// `POST /api/checkout` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart: Vec<CartItemInput>,
    pub customer: CustomerInput,
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub parcel_override: Option<ParcelOverride>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Shipping figure shown to the customer by the quote endpoint.
    pub quoted_shipping_cents: i64,
}

impl CheckoutRequest {
    /// Shape checks that need no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        validate_cart(&self.cart)?;
        self.delivery.target.validate()?;

        if self.customer.first_name.trim().is_empty() || self.customer.last_name.trim().is_empty()
        {
            return Err(CheckoutError::Validation(
                "first and last name are required".to_string(),
            ));
        }
        if self
            .notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS)
        {
            return Err(CheckoutError::Validation(format!(
                "notes must be at most {MAX_NOTES_CHARS} characters"
            )));
        }
        if self.quoted_shipping_cents < 0 {
            return Err(CheckoutError::Validation(
                "quoted shipping cannot be negative".to_string(),
            ));
        }
        validate_override(self.parcel_override.as_ref())
    }

    #[must_use]
    pub fn quoted_shipping(&self) -> Cents {
        Cents::new(self.quoted_shipping_cents)
    }

    /// Trimmed customer snapshot to store on the order.
    #[must_use]
    pub fn customer_snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            first_name: self.customer.first_name.trim().to_string(),
            last_name: self.customer.last_name.trim().to_string(),
            phone: self.customer.phone.clone(),
        }
    }

    /// Notes with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn trimmed_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// `POST /api/checkout/quote` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub cart: Vec<CartItemInput>,
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub parcel_override: Option<ParcelOverride>,
}

impl QuoteRequest {
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        validate_cart(&self.cart)?;
        self.delivery.target.validate()?;
        validate_override(self.parcel_override.as_ref())
    }
}

/// `POST /api/checkout/promo` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoPreviewRequest {
    pub code: String,
    pub cart: Vec<CartItemInput>,
}

impl PromoPreviewRequest {
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        validate_cart(&self.cart)
    }
}

fn validate_cart(cart: &[CartItemInput]) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::Validation("cart is empty".to_string()));
    }

    let mut seen = HashSet::with_capacity(cart.len());
    for item in cart {
        if !seen.insert(item.product_id) {
            return Err(CheckoutError::Validation(format!(
                "product {} appears more than once",
                item.product_id
            )));
        }
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(CheckoutError::Validation(format!(
                "quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
                item.product_id
            )));
        }
    }
    Ok(())
}

fn validate_override(override_: Option<&ParcelOverride>) -> Result<(), CheckoutError> {
    let zero = override_.map(ParcelOverride::zero_fields).unwrap_or_default();
    if zero.is_empty() {
        Ok(())
    } else {
        Err(CheckoutError::Validation(format!(
            "parcel override values must be positive: {}",
            zero.join(", ")
        )))
    }
}
