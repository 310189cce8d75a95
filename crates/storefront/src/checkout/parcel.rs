//! Parcel packing: aggregate cart lines into one shippable parcel.
//!
//! Weight is summed exactly in grams and billed in whole kilograms, rounded
//! up. Dimensions use a simple stacking model: the widest footprint among the
//! lines, with every unit stacked on top of each other. This is not a bin
//! packer.

use serde::{Deserialize, Serialize};

use crate::models::CartLine;

/// Grams per billed kilogram.
pub const GRAMS_PER_KG: u64 = 1_000;

/// Carton used for any dimension a line does not declare, in cm
/// (length, width, height).
pub const DEFAULT_CARTON_CM: (u32, u32, u32) = (20, 15, 10);

/// The physical shipping unit submitted to the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub weight_kg: u32,
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
}

/// Caller-supplied values that replace computed ones field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelOverride {
    pub weight_kg: Option<u32>,
    pub length_cm: Option<u32>,
    pub width_cm: Option<u32>,
    pub height_cm: Option<u32>,
}

impl ParcelOverride {
    /// Names of override fields that are present but zero.
    #[must_use]
    pub fn zero_fields(&self) -> Vec<&'static str> {
        [
            ("weight_kg", self.weight_kg),
            ("length_cm", self.length_cm),
            ("width_cm", self.width_cm),
            ("height_cm", self.height_cm),
        ]
        .into_iter()
        .filter(|(_, v)| *v == Some(0))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Compute the parcel for the physical lines of a cart.
///
/// Digital lines are ignored. Callers reject carts without physical lines
/// before getting here; an empty input yields the default carton at 1 kg.
#[must_use]
pub fn compute_parcel(lines: &[CartLine]) -> Parcel {
    let (default_length, default_width, default_height) = DEFAULT_CARTON_CM;

    let mut grams: u64 = 0;
    let mut length = 0;
    let mut width = 0;
    let mut height: u64 = 0;
    let mut any = false;

    for line in lines.iter().filter(|l| l.is_physical) {
        any = true;
        let quantity = u64::from(line.quantity);
        grams = grams.saturating_add(u64::from(line.weight_grams).saturating_mul(quantity));
        length = length.max(line.length_cm.unwrap_or(default_length));
        width = width.max(line.width_cm.unwrap_or(default_width));
        height = height.saturating_add(
            u64::from(line.height_cm.unwrap_or(default_height)).saturating_mul(quantity),
        );
    }

    if !any {
        return Parcel {
            weight_kg: 1,
            length_cm: default_length,
            width_cm: default_width,
            height_cm: default_height,
        };
    }

    Parcel {
        weight_kg: billable_kg(grams),
        length_cm: length,
        width_cm: width,
        height_cm: u32::try_from(height).unwrap_or(u32::MAX),
    }
}

/// Grams to whole kilograms, rounded up, at least 1.
#[must_use]
pub fn billable_kg(grams: u64) -> u32 {
    let kg = grams.div_ceil(GRAMS_PER_KG).max(1);
    u32::try_from(kg).unwrap_or(u32::MAX)
}

/// Replace every field present in `override_` and keep the rest.
#[must_use]
pub fn apply_parcel_overrides(parcel: Parcel, override_: &ParcelOverride) -> Parcel {
    Parcel {
        weight_kg: override_.weight_kg.unwrap_or(parcel.weight_kg),
        length_cm: override_.length_cm.unwrap_or(parcel.length_cm),
        width_cm: override_.width_cm.unwrap_or(parcel.width_cm),
        height_cm: override_.height_cm.unwrap_or(parcel.height_cm),
    }
}

#[cfg(test)]
mod tests {
    use souk_core::{Cents, ProductId};

    use super::*;

    fn line(weight_grams: u32, quantity: u32, dims: Option<(u32, u32, u32)>) -> CartLine {
        CartLine {
            product_id: ProductId::new(1),
            name: "item".to_string(),
            sku: None,
            category_id: None,
            unit_price: Cents::new(100),
            quantity,
            weight_grams,
            length_cm: dims.map(|d| d.0),
            width_cm: dims.map(|d| d.1),
            height_cm: dims.map(|d| d.2),
            is_physical: true,
        }
    }

    #[test]
    fn test_weight_rounds_up_to_whole_kg() {
        let parcel = compute_parcel(&[line(400, 3, None)]);
        // 1200 g -> 2 kg
        assert_eq!(parcel.weight_kg, 2);

        let parcel = compute_parcel(&[line(1_000, 1, None)]);
        assert_eq!(parcel.weight_kg, 1);

        let parcel = compute_parcel(&[line(1, 1, None)]);
        assert_eq!(parcel.weight_kg, 1);
    }

    #[test]
    fn test_missing_dimensions_use_default_carton() {
        let parcel = compute_parcel(&[line(500, 1, None)]);
        assert_eq!(
            (parcel.length_cm, parcel.width_cm, parcel.height_cm),
            DEFAULT_CARTON_CM
        );
    }

    #[test]
    fn test_stacking_takes_max_footprint_and_sums_heights() {
        let parcel = compute_parcel(&[
            line(500, 2, Some((30, 10, 4))),
            line(200, 1, Some((12, 25, 6))),
        ]);
        assert_eq!(parcel.length_cm, 30);
        assert_eq!(parcel.width_cm, 25);
        assert_eq!(parcel.height_cm, 4 * 2 + 6);
        assert_eq!(parcel.weight_kg, 2);
    }

    #[test]
    fn test_digital_lines_are_ignored() {
        let mut ebook = line(5_000, 1, Some((100, 100, 100)));
        ebook.is_physical = false;
        let parcel = compute_parcel(&[ebook, line(300, 1, Some((10, 10, 2)))]);
        assert_eq!(parcel.weight_kg, 1);
        assert_eq!(parcel.length_cm, 10);
        assert_eq!(parcel.height_cm, 2);
    }

    #[test]
    fn test_overrides_win_field_by_field() {
        let computed = compute_parcel(&[line(2_500, 1, Some((30, 20, 10)))]);
        let parcel = apply_parcel_overrides(
            computed,
            &ParcelOverride {
                weight_kg: Some(5),
                height_cm: Some(40),
                ..ParcelOverride::default()
            },
        );
        assert_eq!(
            parcel,
            Parcel {
                weight_kg: 5,
                length_cm: 30,
                width_cm: 20,
                height_cm: 40,
            }
        );
    }

    #[test]
    fn test_zero_override_fields_are_reported() {
        let override_ = ParcelOverride {
            weight_kg: Some(0),
            width_cm: Some(3),
            ..ParcelOverride::default()
        };
        assert_eq!(override_.zero_fields(), vec!["weight_kg"]);
    }
}
