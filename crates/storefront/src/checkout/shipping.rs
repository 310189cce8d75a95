//! Shipping quotes from per-region rates.

use souk_core::{Cents, DeliveryMode};

use super::parcel::Parcel;
use crate::models::ShippingRate;

/// Price a parcel for a delivery mode.
///
/// `base(mode) + max(0, weight_kg - included_kg) * extra_kg_cents`.
/// Returns `None` on overflow.
#[must_use]
pub fn quote(rate: &ShippingRate, mode: DeliveryMode, parcel: &Parcel) -> Option<Cents> {
    let base = match mode {
        DeliveryMode::Home => rate.home_cents,
        DeliveryMode::Desk => rate.desk_cents,
    };
    let included = u32::try_from(rate.included_kg).unwrap_or(0);
    let extra_kg = parcel.weight_kg.saturating_sub(included);
    let surcharge = rate.extra_kg_cents.times(extra_kg)?;
    base.checked_add(surcharge)
}
