//! Carrier gateway: hand parcels to the external shipping carrier.
//!
//! Submission happens after the order transaction has committed and is never
//! part of it. Every attempt, including a deferral while submission is
//! disabled, is appended to the shipment's audit trail.
//!
//! - [`CarrierGateway`] is the seam the orchestrator talks to
//! - [`HttpCarrierClient`] submits to the carrier's REST API
//! - [`DisabledCarrier`] queues everything for manual review

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::HttpCarrierClient;
pub use error::CarrierError;
pub use types::{CarrierAttempt, CarrierReceipt, ShipmentPayload, ShipmentUpdate};

/// Something that can accept shipments.
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    /// Whether submissions are attempted at all.
    fn is_enabled(&self) -> bool;

    /// Submit one shipment. Exactly one attempt, no retries.
    async fn submit(&self, payload: &ShipmentPayload) -> Result<CarrierReceipt, CarrierError>;
}

/// Gateway used while carrier submission is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCarrier;

#[async_trait]
impl CarrierGateway for DisabledCarrier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn submit(&self, _payload: &ShipmentPayload) -> Result<CarrierReceipt, CarrierError> {
        Err(CarrierError::Disabled)
    }
}
