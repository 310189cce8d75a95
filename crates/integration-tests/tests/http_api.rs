//! HTTP API tests through the full router and middleware stack.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use souk_integration_tests::{ALGER, CarrierMode, TestShop};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-real-ip", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn checkout_body(promo_code: Option<&str>) -> Value {
    json!({
        "cart": [{ "product_id": 1, "quantity": 2, "unit_price_cents": 10000 }],
        "customer": {
            "first_name": "Amina",
            "last_name": "Benali",
            "phone": "0551234567"
        },
        "delivery": { "mode": "home", "region": "Alger", "sub_region": "Bab El Oued" },
        "promo_code": promo_code,
        "quoted_shipping_cents": 60000
    })
}

#[tokio::test]
async fn test_health() {
    let shop = TestShop::new();

    let (status, body) = send(shop.app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_checkout_returns_outcome() {
    let shop = TestShop::new();

    let (status, body) = send(shop.app(), post("/api/checkout", &checkout_body(Some("SAVE10")))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["order_number"], "COD-000001");
    assert_eq!(body["cod_status"], "SUBMITTED");
    assert_eq!(body["pricing"]["subtotal_cents"], 20_000);
    assert_eq!(body["pricing"]["discount_cents"], 2_000);
    assert_eq!(body["pricing"]["total_cents"], 78_000);
    assert_eq!(body["pricing"]["currency"], "DZD");
    assert_eq!(body["carrier"]["tracking"], "TRK-COD-000001");
    assert_eq!(body["carrier"]["payload"]["cod_amount_cents"], 78_000);
}

#[tokio::test]
async fn test_carrier_failure_still_succeeds() {
    let shop = TestShop::with_carrier(CarrierMode::Reject);

    let (status, body) = send(shop.app(), post("/api/checkout", &checkout_body(None))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["cod_status"], "PENDING");
    assert_eq!(body["carrier"]["status"], "failed");
    assert!(body["carrier"]["error"].as_str().unwrap().contains("422"));
}

#[tokio::test]
async fn test_direct_client_without_proxy_headers() {
    let shop = TestShop::new();
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(checkout_body(None).to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 51_000))));

    let (status, body) = send(shop.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_number"], "COD-000001");
    assert_eq!(shop.db.snapshot().orders.len(), 1);
}

#[tokio::test]
async fn test_unknown_client_address_is_json_error() {
    let shop = TestShop::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(checkout_body(None).to_string()))
        .unwrap();

    let (status, body) = send(shop.app(), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"], "Internal server error");
    assert!(shop.db.snapshot().orders.is_empty());
}

#[tokio::test]
async fn test_checkout_burst_is_rate_limited() {
    let shop = TestShop::new();
    let app = shop.app();

    // Burst of 10, then the limiter answers for the route.
    for _ in 0..10 {
        let (status, _) = send(app.clone(), post("/api/checkout", &json!({}))).await;
        assert_ne!(status, StatusCode::TOO_MANY_REQUESTS);
    }
    let (status, body) = send(app, post("/api/checkout", &json!({}))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let shop = TestShop::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", "203.0.113.7")
        .body(Body::from("{ not json"))
        .unwrap();

    let (status, body) = send(shop.app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bad_phone_is_bad_request() {
    let shop = TestShop::new();
    let mut body = checkout_body(None);
    body["customer"]["phone"] = json!("12-34");

    let (status, body) = send(shop.app(), post("/api/checkout", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(shop.db.snapshot().orders.is_empty());
}

#[tokio::test]
async fn test_stale_cart_lists_product_ids() {
    let shop = TestShop::new();
    let mut body = checkout_body(None);
    body["cart"] = json!([
        { "product_id": 1, "quantity": 1, "unit_price_cents": 9000 },
        { "product_id": 2, "quantity": 1 },
        { "product_id": 42, "quantity": 1 }
    ]);

    let (status, body) = send(shop.app(), post("/api/checkout", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CATALOG_MISMATCH");
    assert_eq!(body["product_ids"], json!([1, 42]));
}

#[tokio::test]
async fn test_rejected_code_is_bad_request() {
    let shop = TestShop::new();

    let (status, body) = send(shop.app(), post("/api/checkout", &checkout_body(Some("BIG")))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMO_CODE_REJECTED");
}

#[tokio::test]
async fn test_persistence_failure_hides_details() {
    let shop = TestShop::new();
    shop.db.fail_order_lines(true);

    let (status, body) = send(shop.app(), post("/api/checkout", &checkout_body(None))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "PERSISTENCE_FAILURE");
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_user_header_applies_per_user_limit() {
    let shop = TestShop::new();
    let as_user = |body: &Value| {
        let mut request = post("/api/checkout", body);
        request
            .headers_mut()
            .insert("x-souk-user-id", "7".parse().unwrap());
        request
    };

    let (first, _) = send(shop.app(), as_user(&checkout_body(Some("ONCE")))).await;
    assert_eq!(first, StatusCode::OK);

    let (second, body) = send(shop.app(), as_user(&checkout_body(Some("ONCE")))).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMO_CODE_REJECTED");

    // Anonymous requests are not bound by the per-user limit.
    let (guest, _) = send(shop.app(), post("/api/checkout", &checkout_body(Some("ONCE")))).await;
    assert_eq!(guest, StatusCode::OK);
}

#[tokio::test]
async fn test_quote() {
    let shop = TestShop::new();
    let body = json!({
        "cart": [{ "product_id": 1, "quantity": 2 }],
        "delivery": { "mode": "desk", "region": "Alger", "desk_id": 501 }
    });

    let (status, body) = send(shop.app(), post("/api/checkout/quote", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shipping_cents"], 40_000);
    assert_eq!(body["parcel"]["weight_kg"], 1);
    assert_eq!(body["destination"]["sub_region_name"], "Alger");
}

#[tokio::test]
async fn test_quote_unknown_region() {
    let shop = TestShop::new();
    let body = json!({
        "cart": [{ "product_id": 1, "quantity": 1 }],
        "delivery": { "mode": "home", "region": "Atlantis", "sub_region": "Center" }
    });

    let (status, body) = send(shop.app(), post("/api/checkout/quote", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DESTINATION");
}

#[tokio::test]
async fn test_promo_preview() {
    let shop = TestShop::new();

    let valid = json!({ "code": "save10", "cart": [{ "product_id": 1, "quantity": 2 }] });
    let (status, body) = send(shop.app(), post("/api/checkout/promo", &valid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["discount_cents"], 2_000);

    let below = json!({ "code": "BIG", "cart": [{ "product_id": 1, "quantity": 1 }] });
    let (status, body) = send(shop.app(), post("/api/checkout/promo", &below)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["error_code"], "BELOW_MINIMUM");
}

#[tokio::test]
async fn test_order_lookup() {
    let shop = TestShop::new();
    send(shop.app(), post("/api/checkout", &checkout_body(None))).await;

    let (status, body) = send(shop.app(), get("/api/orders/COD-000001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_number"], "COD-000001");
    assert_eq!(body["total_cents"], 80_000);
    assert_eq!(body["shipment_status"], "submitted");

    let (status, body) = send(shop.app(), get("/api/orders/COD-424242")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "order COD-424242 not found");
}

#[tokio::test]
async fn test_location_listings() {
    let shop = TestShop::new();

    let (status, body) = send(shop.app(), get("/api/locations/regions")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Alger", "Blida", "Oran", "Tamanrasset"]);

    let uri = format!("/api/locations/regions/{ALGER}/sub-regions");
    let (_, body) = send(shop.app(), get(&uri)).await;
    assert_eq!(body["sub_regions"][0]["name"], "Alger");
    assert_eq!(body["sub_regions"][1]["name"], "Bab El Oued");

    let uri = format!("/api/locations/regions/{ALGER}/desks");
    let (_, body) = send(shop.app(), get(&uri)).await;
    let desks = body["desks"].as_array().unwrap();
    assert_eq!(desks.len(), 1);
    assert_eq!(desks[0]["id"], 501);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let shop = TestShop::new();

    let mut request = get("/health");
    request
        .headers_mut()
        .insert("x-request-id", "checkout-abc-123".parse().unwrap());
    let response = shop.app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "checkout-abc-123");

    let response = shop.app().oneshot(get("/health")).await.unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}
