//! Cart and catalog types used by checkout.

use serde::Serialize;
use souk_core::{CategoryId, Cents, ProductId};

/// A catalog entry as read at checkout time.
///
/// Prices always come from here, never from the client.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    /// `None` when the product is not currently priced.
    pub price_cents: Option<Cents>,
    pub category_id: Option<CategoryId>,
    pub is_active: bool,
    /// Digital products do not contribute to the parcel.
    pub is_physical: bool,
    pub weight_grams: i32,
    pub length_cm: Option<i32>,
    pub width_cm: Option<i32>,
    pub height_cm: Option<i32>,
}

/// A cart line validated against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit_price: Cents,
    pub quantity: u32,
    pub weight_grams: u32,
    pub length_cm: Option<u32>,
    pub width_cm: Option<u32>,
    pub height_cm: Option<u32>,
    pub is_physical: bool,
}

impl CartLine {
    /// Build a line from a catalog entry.
    ///
    /// Returns `None` if the product is inactive, unpriced, or carries a
    /// non-positive weight; checkout reports such products as mismatches.
    #[must_use]
    pub fn from_catalog(product: &CatalogProduct, quantity: u32) -> Option<Self> {
        if !product.is_active {
            return None;
        }
        let unit_price = product.price_cents.filter(|p| !p.is_negative())?;
        let weight_grams = u32::try_from(product.weight_grams)
            .ok()
            .filter(|w| *w >= 1)?;

        Some(Self {
            product_id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            category_id: product.category_id,
            unit_price,
            quantity,
            weight_grams,
            length_cm: positive_dimension(product.length_cm),
            width_cm: positive_dimension(product.width_cm),
            height_cm: positive_dimension(product.height_cm),
            is_physical: product.is_physical,
        })
    }

    /// Unit price times quantity, `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Cents> {
        self.unit_price.times(self.quantity)
    }
}

fn positive_dimension(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(1),
            name: "Argan oil".to_string(),
            sku: Some("ARG-100".to_string()),
            price_cents: Some(Cents::new(10_000)),
            category_id: Some(CategoryId::new(3)),
            is_active: true,
            is_physical: true,
            weight_grams: 250,
            length_cm: Some(12),
            width_cm: None,
            height_cm: Some(0),
        }
    }

    #[test]
    fn test_from_catalog_copies_snapshot() {
        let line = CartLine::from_catalog(&product(), 2).unwrap();
        assert_eq!(line.unit_price, Cents::new(10_000));
        assert_eq!(line.line_total(), Some(Cents::new(20_000)));
        assert_eq!(line.length_cm, Some(12));
        assert_eq!(line.width_cm, None);
        // zero is treated as "not provided"
        assert_eq!(line.height_cm, None);
    }

    #[test]
    fn test_from_catalog_rejects_unavailable_products() {
        let mut inactive = product();
        inactive.is_active = false;
        assert!(CartLine::from_catalog(&inactive, 1).is_none());

        let mut unpriced = product();
        unpriced.price_cents = None;
        assert!(CartLine::from_catalog(&unpriced, 1).is_none());

        let mut weightless = product();
        weightless.weight_grams = 0;
        assert!(CartLine::from_catalog(&weightless, 1).is_none());
    }
}
