//! Carrier REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};
use url::Url;

use super::CarrierGateway;
use super::error::CarrierError;
use super::types::{CarrierReceipt, ShipmentPayload};

/// Request timeout for shipment creation.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Carrier API client.
///
/// Creates parcels with `POST {base_url}/parcels`, authenticated with the
/// `X-API-ID` and `X-API-TOKEN` headers.
#[derive(Clone)]
pub struct HttpCarrierClient {
    client: Client,
    base_url: Url,
    api_id: String,
    api_token: SecretString,
}

impl std::fmt::Debug for HttpCarrierClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCarrierClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_id", &self.api_id)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpCarrierClient {
    /// Create a new carrier client.
    ///
    /// # Errors
    ///
    /// Returns `CarrierError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: Url, api_id: String, api_token: SecretString) -> Result<Self, CarrierError> {
        let client = Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| CarrierError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_id,
            api_token,
        })
    }

    fn parcels_url(&self) -> String {
        format!("{}/parcels", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl CarrierGateway for HttpCarrierClient {
    fn is_enabled(&self) -> bool {
        true
    }

    #[instrument(skip(self, payload), fields(order_number = %payload.order_number))]
    async fn submit(&self, payload: &ShipmentPayload) -> Result<CarrierReceipt, CarrierError> {
        let response = self
            .client
            .post(self.parcels_url())
            .header("X-API-ID", &self.api_id)
            .header("X-API-TOKEN", self.api_token.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|e| CarrierError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CarrierError::Response(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, "Carrier rejected shipment");
            return Err(CarrierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| CarrierError::Response(e.to_string()))?;
        let receipt = parse_receipt(raw)?;

        debug!(tracking = %receipt.tracking, "Shipment accepted by carrier");
        Ok(receipt)
    }
}

/// Extract tracking and label from a carrier response.
///
/// Accepts `{"tracking": .., "label": ..}` or the same object keyed by order
/// number, which is how the carrier answers batch submissions.
pub(crate) fn parse_receipt(raw: serde_json::Value) -> Result<CarrierReceipt, CarrierError> {
    let object = if raw.get("tracking").is_some() {
        Some(&raw)
    } else {
        raw.as_object().and_then(|m| m.values().find(|v| v.get("tracking").is_some()))
    };

    let tracking = object
        .and_then(|o| o.get("tracking"))
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(CarrierError::MissingTracking)?;
    let label_url = object
        .and_then(|o| o.get("label").or_else(|| o.get("label_url")))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    Ok(CarrierReceipt {
        tracking,
        label_url,
        raw,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::carrier::types::sample_payload;

    /// Serve `router` on an ephemeral port and return the API base URL.
    async fn carrier_stub(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/api/v1/")).unwrap()
    }

    fn client(base_url: Url) -> HttpCarrierClient {
        HttpCarrierClient::new(base_url, "id-1".to_string(), SecretString::from("token-1"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_accepted() {
        let router = Router::new().route(
            "/api/v1/parcels",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                if headers["x-api-id"] != "id-1" || headers["x-api-token"] != "token-1" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "auth"})));
                }
                let number = body["order_number"].as_str().unwrap().to_string();
                (
                    StatusCode::OK,
                    Json(json!({ number: {"success": true, "tracking": "YAL-42", "label": "https://l/42.pdf"} })),
                )
            }),
        );
        let base = carrier_stub(router).await;

        let receipt = client(base).submit(&sample_payload()).await.unwrap();

        assert_eq!(receipt.tracking, "YAL-42");
        assert_eq!(receipt.label_url.as_deref(), Some("https://l/42.pdf"));
        assert_eq!(receipt.raw["COD-000007"]["success"], true);
    }

    #[tokio::test]
    async fn test_submit_rejected_keeps_status_and_body() {
        let router = Router::new().route(
            "/api/v1/parcels",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"bad phone"}"#) }),
        );
        let base = carrier_stub(router).await;

        let err = client(base).submit(&sample_payload()).await.unwrap_err();

        match err {
            CarrierError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, r#"{"error":"bad phone"}"#);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_non_json_success_is_response_error() {
        let router = Router::new().route("/api/v1/parcels", post(|| async { "queued" }));
        let base = carrier_stub(router).await;

        let err = client(base).submit(&sample_payload()).await.unwrap_err();

        assert!(matches!(err, CarrierError::Response(_)));
    }

    #[tokio::test]
    async fn test_submit_unreachable_is_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let base = Url::parse(&format!("http://{addr}/")).unwrap();

        let err = client(base).submit(&sample_payload()).await.unwrap_err();

        assert!(matches!(err, CarrierError::Request(_)));
        assert!(err.to_string().starts_with("carrier request failed"));
    }

    #[test]
    fn test_parse_flat_receipt() {
        let receipt =
            parse_receipt(json!({"tracking": "YAL-123", "label": "https://l/1.pdf"})).unwrap();
        assert_eq!(receipt.tracking, "YAL-123");
        assert_eq!(receipt.label_url.as_deref(), Some("https://l/1.pdf"));
    }

    #[test]
    fn test_parse_keyed_receipt() {
        let receipt = parse_receipt(json!({
            "COD-000001": {"success": true, "tracking": "YAL-9", "label_url": null}
        }))
        .unwrap();
        assert_eq!(receipt.tracking, "YAL-9");
        assert_eq!(receipt.label_url, None);
    }

    #[test]
    fn test_missing_tracking() {
        assert!(matches!(
            parse_receipt(json!({"success": false})),
            Err(CarrierError::MissingTracking)
        ));
        assert!(matches!(
            parse_receipt(json!({"tracking": ""})),
            Err(CarrierError::MissingTracking)
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = HttpCarrierClient::new(
            Url::parse("https://carrier.example/api/v1/").unwrap(),
            "id-1".to_string(),
            SecretString::from("super-secret"),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert_eq!(client.parcels_url(), "https://carrier.example/api/v1/parcels");
    }
}
