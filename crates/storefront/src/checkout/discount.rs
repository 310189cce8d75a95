//! Discount engine: promotional code validation and discount computation.
//!
//! Validation runs in a fixed order and the first failure wins:
//!
//! 1. the code exists
//! 2. it is active
//! 3. it has not expired
//! 4. it has started
//! 5. the global usage limit is not reached
//! 6. the per-user usage limit is not reached (identified users only)
//! 7. the order subtotal meets the minimum
//! 8. at least one cart line is eligible
//!
//! The discount is computed over the eligible lines only, capped first at the
//! code's maximum and then at the eligible subtotal. Validation never touches
//! usage counters; the order store records usage inside the order
//! transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use souk_core::{Cents, DiscountType, PromoCode, PromoCodeId, UserId};
use thiserror::Error;
use tracing::instrument;

use super::store::PromotionStore;
use crate::db::RepositoryError;
use crate::models::{CartLine, DiscountKind, PromotionalCode};

/// Why a promotional code cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("promotional code not found")]
    CodeNotFound,

    #[error("promotional code is not active")]
    CodeInactive,

    #[error("promotional code has expired")]
    CodeExpired,

    #[error("promotional code is not active yet")]
    CodeNotYetActive,

    #[error("promotional code usage limit reached")]
    GlobalLimitReached,

    #[error("you have already used this promotional code")]
    UserLimitReached,

    #[error("order subtotal {subtotal} is below the minimum of {minimum}")]
    BelowMinimum { minimum: Cents, subtotal: Cents },

    #[error("no item in the cart is eligible for this code")]
    NoEligibleItems,

    #[error("eligible subtotal is too large")]
    AmountOverflow,
}

impl DiscountError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CodeNotFound => "CODE_NOT_FOUND",
            Self::CodeInactive => "CODE_INACTIVE",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::CodeNotYetActive => "CODE_NOT_YET_ACTIVE",
            Self::GlobalLimitReached => "GLOBAL_LIMIT_REACHED",
            Self::UserLimitReached => "USER_LIMIT_REACHED",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM",
            Self::NoEligibleItems => "NO_ELIGIBLE_ITEMS",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
        }
    }
}

/// A validated code with its computed effect on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    pub code_id: PromoCodeId,
    pub code: PromoCode,
    pub discount_type: DiscountType,
    /// Amount taken off the goods, in `0..=eligible_subtotal`.
    pub amount: Cents,
    pub eligible_subtotal: Cents,
    /// Set by free-shipping codes.
    pub waives_shipping: bool,
    /// Re-checked by the order store for identified users.
    pub user_usage_limit: Option<u32>,
}

/// Side-effect free answer for the code preview endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountValidation {
    pub is_valid: bool,
    pub discount_cents: Cents,
    pub free_shipping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<AppliedDiscount, DiscountError>> for DiscountValidation {
    fn from(result: Result<AppliedDiscount, DiscountError>) -> Self {
        match result {
            Ok(applied) => Self {
                is_valid: true,
                discount_cents: applied.amount,
                free_shipping: applied.waives_shipping,
                error_code: None,
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                discount_cents: Cents::ZERO,
                free_shipping: false,
                error_code: Some(e.code()),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Steps 2 to 5: status, validity window and global usage.
///
/// # Errors
///
/// Returns the first failing check.
pub fn check_availability(code: &PromotionalCode, now: DateTime<Utc>) -> Result<(), DiscountError> {
    if !code.is_active {
        return Err(DiscountError::CodeInactive);
    }
    if code.expires_at.is_some_and(|expires| now >= expires) {
        return Err(DiscountError::CodeExpired);
    }
    if now < code.starts_at {
        return Err(DiscountError::CodeNotYetActive);
    }
    if code.usage_limit.is_some_and(|limit| code.used_count >= limit) {
        return Err(DiscountError::GlobalLimitReached);
    }
    Ok(())
}

/// Step 6 for a user who has used the code `times_used` times.
///
/// # Errors
///
/// Returns [`DiscountError::UserLimitReached`] when the limit is exhausted.
pub fn check_user_usage(code: &PromotionalCode, times_used: u32) -> Result<(), DiscountError> {
    match code.user_usage_limit {
        Some(limit) if times_used >= limit => Err(DiscountError::UserLimitReached),
        _ => Ok(()),
    }
}

/// Steps 7 and 8 plus the discount computation.
///
/// # Errors
///
/// Returns [`DiscountError::BelowMinimum`], [`DiscountError::NoEligibleItems`],
/// or [`DiscountError::AmountOverflow`] when the eligible lines do not sum.
pub fn compute_discount(
    code: &PromotionalCode,
    lines: &[CartLine],
    subtotal: Cents,
) -> Result<AppliedDiscount, DiscountError> {
    if let Some(minimum) = code.minimum_amount
        && subtotal < minimum
    {
        return Err(DiscountError::BelowMinimum { minimum, subtotal });
    }

    let eligible: Vec<&CartLine> = lines
        .iter()
        .filter(|line| code.eligibility.admits(line))
        .collect();
    if eligible.is_empty() {
        return Err(DiscountError::NoEligibleItems);
    }
    let eligible_subtotal = eligible
        .iter()
        .try_fold(Cents::ZERO, |acc, line| {
            line.line_total().and_then(|t| acc.checked_add(t))
        })
        .ok_or(DiscountError::AmountOverflow)?;

    let raw = match code.kind {
        // Overflow only happens for absurd percentages; the cap below applies.
        DiscountKind::Percentage(percent) => eligible_subtotal
            .percentage(percent)
            .unwrap_or(eligible_subtotal),
        DiscountKind::FixedAmount(amount) => amount,
        DiscountKind::FreeShipping => Cents::ZERO,
    };

    let mut amount = raw.non_negative();
    if let Some(cap) = code.maximum_discount {
        amount = amount.min(cap.non_negative());
    }
    amount = amount.min(eligible_subtotal);

    Ok(AppliedDiscount {
        code_id: code.id,
        code: code.code.clone(),
        discount_type: code.kind.discount_type(),
        amount,
        eligible_subtotal,
        waives_shipping: matches!(code.kind, DiscountKind::FreeShipping),
        user_usage_limit: code.user_usage_limit,
    })
}

/// Runs the full validation against a [`PromotionStore`].
#[derive(Clone)]
pub struct DiscountEngine {
    store: Arc<dyn PromotionStore>,
}

impl DiscountEngine {
    #[must_use]
    pub fn new(store: Arc<dyn PromotionStore>) -> Self {
        Self { store }
    }

    /// Validate `code` for a cart and compute its discount.
    ///
    /// The outer `Result` carries store failures, the inner one the
    /// validation outcome.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup fails.
    #[instrument(skip(self, lines), fields(code = %code))]
    pub async fn evaluate(
        &self,
        code: &PromoCode,
        user_id: Option<UserId>,
        lines: &[CartLine],
        subtotal: Cents,
        now: DateTime<Utc>,
    ) -> Result<Result<AppliedDiscount, DiscountError>, RepositoryError> {
        let Some(promo) = self.store.code_by_name(code).await? else {
            return Ok(Err(DiscountError::CodeNotFound));
        };

        if let Err(e) = check_availability(&promo, now) {
            return Ok(Err(e));
        }

        if let Some(user_id) = user_id
            && promo.user_usage_limit.is_some()
        {
            let used = self.store.user_usage_count(promo.id, user_id).await?;
            if let Err(e) = check_user_usage(&promo, used) {
                return Ok(Err(e));
            }
        }

        let result = compute_discount(&promo, lines, subtotal);
        match &result {
            Ok(applied) => tracing::debug!(amount = %applied.amount, "Promotional code accepted"),
            Err(e) => tracing::info!(reason = e.code(), "Promotional code rejected"),
        }
        Ok(result)
    }

    /// Same as [`Self::evaluate`], flattened for preview responses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup fails.
    pub async fn validate_code(
        &self,
        code: &PromoCode,
        user_id: Option<UserId>,
        lines: &[CartLine],
        subtotal: Cents,
        now: DateTime<Utc>,
    ) -> Result<DiscountValidation, RepositoryError> {
        self.evaluate(code, user_id, lines, subtotal, now)
            .await
            .map(DiscountValidation::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;
    use souk_core::{CategoryId, ProductId};

    use super::*;
    use crate::models::Eligibility;

    fn line(product: i32, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            name: format!("product {product}"),
            sku: None,
            category_id: Some(CategoryId::new(1)),
            unit_price: Cents::new(price),
            quantity,
            weight_grams: 500,
            length_cm: None,
            width_cm: None,
            height_cm: None,
            is_physical: true,
        }
    }

    fn promo(kind: DiscountKind) -> PromotionalCode {
        PromotionalCode {
            id: PromoCodeId::new(1),
            code: PromoCode::parse("SAVE10").unwrap(),
            kind,
            minimum_amount: None,
            maximum_discount: None,
            usage_limit: None,
            used_count: 0,
            user_usage_limit: None,
            is_active: true,
            starts_at: Utc::now() - Duration::days(1),
            expires_at: None,
            eligibility: Eligibility::default(),
        }
    }

    #[test]
    fn test_percentage_over_whole_cart() {
        let code = promo(DiscountKind::Percentage(Decimal::TEN));
        let applied = compute_discount(&code, &[line(1, 10_000, 2)], Cents::new(20_000)).unwrap();
        assert_eq!(applied.eligible_subtotal, Cents::new(20_000));
        assert_eq!(applied.amount, Cents::new(2_000));
        assert!(!applied.waives_shipping);
    }

    #[test]
    fn test_maximum_discount_caps_percentage() {
        let mut code = promo(DiscountKind::Percentage(Decimal::from(50)));
        code.maximum_discount = Some(Cents::new(1_000));
        let applied = compute_discount(&code, &[line(1, 10_000, 2)], Cents::new(20_000)).unwrap();
        assert_eq!(applied.amount, Cents::new(1_000));
    }

    #[test]
    fn test_fixed_amount_capped_at_eligible_subtotal() {
        let mut code = promo(DiscountKind::FixedAmount(Cents::new(50_000)));
        code.eligibility.applicable_products = vec![ProductId::new(2)];
        let lines = [line(1, 10_000, 1), line(2, 3_000, 1)];
        let applied = compute_discount(&code, &lines, Cents::new(13_000)).unwrap();
        assert_eq!(applied.eligible_subtotal, Cents::new(3_000));
        assert_eq!(applied.amount, Cents::new(3_000));
    }

    #[test]
    fn test_free_shipping_has_no_amount() {
        let code = promo(DiscountKind::FreeShipping);
        let applied = compute_discount(&code, &[line(1, 1_000, 1)], Cents::new(1_000)).unwrap();
        assert_eq!(applied.amount, Cents::ZERO);
        assert!(applied.waives_shipping);
    }

    #[test]
    fn test_below_minimum() {
        let mut code = promo(DiscountKind::Percentage(Decimal::TEN));
        code.minimum_amount = Some(Cents::new(30_000));
        let err = compute_discount(&code, &[line(1, 10_000, 2)], Cents::new(20_000)).unwrap_err();
        assert_eq!(
            err,
            DiscountError::BelowMinimum {
                minimum: Cents::new(30_000),
                subtotal: Cents::new(20_000),
            }
        );
        let validation = DiscountValidation::from(Err(err));
        assert!(!validation.is_valid);
        assert_eq!(validation.discount_cents, Cents::ZERO);
        assert_eq!(validation.error_code, Some("BELOW_MINIMUM"));
    }

    #[test]
    fn test_no_eligible_items_when_all_excluded() {
        let mut code = promo(DiscountKind::Percentage(Decimal::TEN));
        code.eligibility.excluded_products = vec![ProductId::new(1)];
        let err = compute_discount(&code, &[line(1, 1_000, 1)], Cents::new(1_000)).unwrap_err();
        assert_eq!(err, DiscountError::NoEligibleItems);
    }

    #[test]
    fn test_overflowing_line_is_an_error() {
        let code = promo(DiscountKind::Percentage(Decimal::TEN));
        let lines = [line(1, 10_000, 1), line(2, i64::MAX / 2, 3)];
        let err = compute_discount(&code, &lines, Cents::new(10_000)).unwrap_err();
        assert_eq!(err, DiscountError::AmountOverflow);
        assert_eq!(err.code(), "AMOUNT_OVERFLOW");
    }

    #[test]
    fn test_availability_checks_run_in_order() {
        let now = Utc::now();

        let mut code = promo(DiscountKind::FreeShipping);
        code.is_active = false;
        code.expires_at = Some(now - Duration::hours(1));
        assert_eq!(check_availability(&code, now), Err(DiscountError::CodeInactive));

        code.is_active = true;
        assert_eq!(check_availability(&code, now), Err(DiscountError::CodeExpired));

        code.expires_at = None;
        code.starts_at = now + Duration::hours(1);
        assert_eq!(check_availability(&code, now), Err(DiscountError::CodeNotYetActive));

        code.starts_at = now - Duration::hours(1);
        code.usage_limit = Some(3);
        code.used_count = 3;
        assert_eq!(
            check_availability(&code, now),
            Err(DiscountError::GlobalLimitReached)
        );

        code.used_count = 2;
        assert_eq!(check_availability(&code, now), Ok(()));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let mut code = promo(DiscountKind::FreeShipping);
        code.expires_at = Some(now);
        assert_eq!(check_availability(&code, now), Err(DiscountError::CodeExpired));
        code.starts_at = now;
        code.expires_at = None;
        assert_eq!(check_availability(&code, now), Ok(()));
    }

    #[test]
    fn test_user_usage_limit() {
        let mut code = promo(DiscountKind::FreeShipping);
        assert_eq!(check_user_usage(&code, 10), Ok(()));
        code.user_usage_limit = Some(1);
        assert_eq!(check_user_usage(&code, 0), Ok(()));
        assert_eq!(check_user_usage(&code, 1), Err(DiscountError::UserLimitReached));
    }

    #[test]
    fn test_discount_bounds_over_value_grid() {
        let lines = [line(1, 1_999, 3), line(2, 45, 7)];
        let subtotal = Cents::new(1_999 * 3 + 45 * 7);
        let kinds = [
            DiscountKind::Percentage(Decimal::new(1, 1)),
            DiscountKind::Percentage(Decimal::new(3333, 2)),
            DiscountKind::Percentage(Decimal::from(100)),
            DiscountKind::Percentage(Decimal::from(250)),
            DiscountKind::FixedAmount(Cents::new(1)),
            DiscountKind::FixedAmount(Cents::new(-500)),
            DiscountKind::FixedAmount(Cents::new(1_000_000)),
            DiscountKind::FreeShipping,
        ];
        let caps = [None, Some(Cents::ZERO), Some(Cents::new(100)), Some(Cents::new(-1))];

        for kind in kinds {
            for cap in caps {
                let mut code = promo(kind);
                code.maximum_discount = cap;
                let applied = compute_discount(&code, &lines, subtotal).unwrap();
                assert!(!applied.amount.is_negative(), "{kind:?} {cap:?}");
                assert!(applied.amount <= applied.eligible_subtotal, "{kind:?} {cap:?}");
            }
        }
    }
}
