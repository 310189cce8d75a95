//! Carrier errors.

use thiserror::Error;

/// Errors that can occur when submitting to the carrier.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// Submission is switched off by configuration.
    #[error("carrier submission is disabled")]
    Disabled,

    /// HTTP request failed (connection, timeout).
    #[error("carrier request failed: {0}")]
    Request(String),

    /// Carrier answered with a non-success status.
    #[error("carrier rejected the shipment ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Failed to parse the carrier's response.
    #[error("carrier response error: {0}")]
    Response(String),

    /// Carrier accepted the request but returned no tracking number.
    #[error("carrier response has no tracking number")]
    MissingTracking,

    /// Client could not be built.
    #[error("carrier configuration error: {0}")]
    Config(String),
}
