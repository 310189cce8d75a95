//! Pricing engine: exact integer totals.
//!
//! `total = subtotal + shipping - discount`, clamped at zero. Shipping is the
//! figure the customer was quoted, passed through unchanged, unless a
//! free-shipping code waives it.

use serde::Serialize;
use souk_core::Cents;

use super::CheckoutError;
use crate::models::CartLine;

/// Money breakdown of an order, all in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: Cents,
    pub discount: Cents,
    pub shipping: Cents,
    pub total: Cents,
    /// Whether a code waived the quoted shipping charge.
    pub shipping_waived: bool,
}

/// Sum of `unit_price * quantity` over the lines.
///
/// # Errors
///
/// Returns [`CheckoutError::Validation`] when the sum does not fit in `i64`.
pub fn subtotal(lines: &[CartLine]) -> Result<Cents, CheckoutError> {
    lines.iter().try_fold(Cents::ZERO, |acc, line| {
        line.line_total()
            .and_then(|t| acc.checked_add(t))
            .ok_or_else(|| CheckoutError::Validation("cart total is too large".to_string()))
    })
}

/// Combine the parts into a final breakdown.
///
/// `discount` is expected to be in `0..=subtotal` already; the total is still
/// clamped so a bad input can never produce a negative charge.
///
/// # Errors
///
/// Returns [`CheckoutError::Validation`] on arithmetic overflow.
pub fn price_order(
    subtotal: Cents,
    discount: Cents,
    quoted_shipping: Cents,
    waive_shipping: bool,
) -> Result<PriceBreakdown, CheckoutError> {
    let shipping = if waive_shipping {
        Cents::ZERO
    } else {
        quoted_shipping.non_negative()
    };
    let discount = discount.non_negative();
    let total = subtotal
        .checked_add(shipping)
        .and_then(|t| t.checked_sub(discount))
        .ok_or_else(|| CheckoutError::Validation("order total is too large".to_string()))?
        .non_negative();

    Ok(PriceBreakdown {
        subtotal,
        discount,
        shipping,
        total,
        shipping_waived: waive_shipping,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souk_core::ProductId;

    use super::*;

    fn line(price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(1),
            name: "item".to_string(),
            sku: None,
            category_id: None,
            unit_price: Cents::new(price),
            quantity,
            weight_grams: 100,
            length_cm: None,
            width_cm: None,
            height_cm: None,
            is_physical: true,
        }
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let total = subtotal(&[line(10_000, 2), line(250, 3)]).unwrap();
        assert_eq!(total, Cents::new(20_750));
    }

    #[test]
    fn test_subtotal_overflow_is_validation_error() {
        let err = subtotal(&[line(i64::MAX, 2)]).unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn test_total_identity() {
        let pricing =
            price_order(Cents::new(20_000), Cents::new(2_000), Cents::new(500), false).unwrap();
        assert_eq!(pricing.total, Cents::new(18_500));
        assert_eq!(
            pricing.total,
            pricing.subtotal + pricing.shipping - pricing.discount
        );
    }

    #[test]
    fn test_waived_shipping_is_zero() {
        let pricing = price_order(Cents::new(5_000), Cents::ZERO, Cents::new(700), true).unwrap();
        assert_eq!(pricing.shipping, Cents::ZERO);
        assert_eq!(pricing.total, Cents::new(5_000));
        assert!(pricing.shipping_waived);
    }

    #[test]
    fn test_total_never_negative() {
        let pricing = price_order(Cents::new(100), Cents::new(900), Cents::ZERO, false).unwrap();
        assert_eq!(pricing.total, Cents::ZERO);
    }
}
