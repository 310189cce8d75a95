//! Promotional code domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use souk_core::{CategoryId, Cents, DiscountType, ProductId, PromoCode, PromoCodeId};

use super::cart::CartLine;

/// What a code takes off the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Percent of the eligible subtotal (may be fractional).
    Percentage(Decimal),
    /// Flat amount.
    FixedAmount(Cents),
    /// Waives the shipping charge; no amount off the goods.
    FreeShipping,
}

impl DiscountKind {
    #[must_use]
    pub const fn discount_type(&self) -> DiscountType {
        match self {
            Self::Percentage(_) => DiscountType::Percentage,
            Self::FixedAmount(_) => DiscountType::FixedAmount,
            Self::FreeShipping => DiscountType::FreeShipping,
        }
    }
}

/// Product and category restrictions of a code.
///
/// Empty `applicable_*` lists mean "everything not excluded".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub applicable_products: Vec<ProductId>,
    pub applicable_categories: Vec<CategoryId>,
    pub excluded_products: Vec<ProductId>,
}

impl Eligibility {
    /// Whether a cart line may be discounted by the code.
    #[must_use]
    pub fn admits(&self, line: &CartLine) -> bool {
        if self.excluded_products.contains(&line.product_id) {
            return false;
        }
        if self.applicable_products.is_empty() && self.applicable_categories.is_empty() {
            return true;
        }
        self.applicable_products.contains(&line.product_id)
            || line
                .category_id
                .is_some_and(|c| self.applicable_categories.contains(&c))
    }
}

/// A promotional code as configured by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionalCode {
    pub id: PromoCodeId,
    pub code: PromoCode,
    pub kind: DiscountKind,
    pub minimum_amount: Option<Cents>,
    pub maximum_discount: Option<Cents>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub user_usage_limit: Option<u32>,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub eligibility: Eligibility,
}

/// Administrator input for a new code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromoCode {
    pub code: PromoCode,
    pub kind: DiscountKind,
    pub minimum_amount: Option<Cents>,
    pub maximum_discount: Option<Cents>,
    pub usage_limit: Option<u32>,
    pub user_usage_limit: Option<u32>,
    /// Defaults to now.
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub eligibility: Eligibility,
}
