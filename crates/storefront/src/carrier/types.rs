//! Carrier request, response and audit types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_core::{Cents, DeliveryMode, DeskId, ShipmentStatus};

use super::error::CarrierError;
use crate::models::NewOrder;

/// Data submitted to the carrier for one parcel.
///
/// Mirrors the `carrier_shipment` row written with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPayload {
    pub order_number: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub region: String,
    pub sub_region: String,
    pub delivery_mode: DeliveryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk_id: Option<DeskId>,
    /// Human-readable contents, e.g. `2x Mug, 1x Poster`.
    pub product_list: String,
    /// Value of the goods after discount.
    pub declared_value_cents: Cents,
    /// Amount the courier collects on delivery.
    pub cod_amount_cents: Cents,
    pub weight_kg: u32,
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
    pub free_shipping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_region: Option<String>,
}

impl ShipmentPayload {
    /// Build the payload for a persisted order.
    #[must_use]
    pub fn for_order(order: &NewOrder, order_number: &str, from_region: Option<&str>) -> Self {
        let product_list = order
            .lines
            .iter()
            .map(|l| format!("{}x {}", l.quantity, l.name))
            .collect::<Vec<_>>()
            .join(", ");

        let declared_value = order
            .pricing
            .subtotal
            .checked_sub(order.pricing.discount)
            .unwrap_or(Cents::ZERO)
            .non_negative();

        Self {
            order_number: order_number.to_string(),
            first_name: order.customer.first_name.clone(),
            last_name: order.customer.last_name.clone(),
            phone: order.customer.phone.to_string(),
            region: order.destination.region_name.clone(),
            sub_region: order.destination.sub_region_name.clone(),
            delivery_mode: order.destination.mode,
            desk_id: order.destination.desk.as_ref().map(|d| d.id),
            product_list,
            declared_value_cents: declared_value,
            cod_amount_cents: order.pricing.total,
            weight_kg: order.parcel.weight_kg,
            length_cm: order.parcel.length_cm,
            width_cm: order.parcel.width_cm,
            height_cm: order.parcel.height_cm,
            free_shipping: order.free_shipping,
            from_region: from_region.map(str::to_string),
        }
    }
}

/// What the carrier returns for an accepted shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarrierReceipt {
    pub tracking: String,
    pub label_url: Option<String>,
    /// Raw response body, kept for the audit trail.
    pub raw: serde_json::Value,
}

/// One submission attempt as stored in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierAttempt {
    pub request: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Outcome of an attempt, applied to the shipment row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentUpdate {
    pub status: ShipmentStatus,
    pub tracking: Option<String>,
    pub label_url: Option<String>,
    pub attempt: CarrierAttempt,
}

impl ShipmentUpdate {
    /// Build the update for the result of [`super::CarrierGateway::submit`].
    #[must_use]
    pub fn from_result(
        payload: &ShipmentPayload,
        result: &Result<CarrierReceipt, CarrierError>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        let request = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);

        match result {
            Ok(receipt) => Self {
                status: ShipmentStatus::Submitted,
                tracking: Some(receipt.tracking.clone()),
                label_url: receipt.label_url.clone(),
                attempt: CarrierAttempt {
                    request,
                    response: Some(receipt.raw.clone()),
                    error: None,
                    attempted_at,
                },
            },
            Err(e) => Self {
                status: if matches!(e, CarrierError::Disabled) {
                    ShipmentStatus::Deferred
                } else {
                    ShipmentStatus::Failed
                },
                tracking: None,
                label_url: None,
                attempt: CarrierAttempt {
                    request,
                    response: rejected_response(e),
                    error: Some(e.to_string()),
                    attempted_at,
                },
            },
        }
    }
}

/// Raw reply of a rejected submission, as JSON when the carrier sent JSON.
fn rejected_response(error: &CarrierError) -> Option<serde_json::Value> {
    let CarrierError::Rejected { status, body } = error else {
        return None;
    };
    let body = serde_json::from_str(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.clone()));
    Some(serde_json::json!({ "status": status, "body": body }))
}

#[cfg(test)]
pub(crate) fn sample_payload() -> ShipmentPayload {
    ShipmentPayload {
        order_number: "COD-000007".to_string(),
        first_name: "Amina".to_string(),
        last_name: "Benali".to_string(),
        phone: "0551234567".to_string(),
        region: "Alger".to_string(),
        sub_region: "Bab El Oued".to_string(),
        delivery_mode: DeliveryMode::Home,
        desk_id: None,
        product_list: "2x Mug".to_string(),
        declared_value_cents: Cents::new(20_000),
        cod_amount_cents: Cents::new(80_000),
        weight_kg: 1,
        length_cm: 20,
        width_cm: 15,
        height_cm: 10,
        free_shipping: false,
        from_region: None,
    }
}
