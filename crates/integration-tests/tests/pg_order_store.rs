//! `PgOrderStore` against a real `PostgreSQL`.
//!
//! Each test gets a fresh, migrated database from `sqlx::test`, which reads
//! `DATABASE_URL`. Run with:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/souk_test cargo test -p souk-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use souk_core::{
    CategoryId, Cents, CurrencyCode, DeliveryMode, OrderStatus, Phone, ProductId, PromoCode,
    ShipmentStatus, UserId,
};
use souk_storefront::carrier::{CarrierAttempt, ShipmentUpdate};
use souk_storefront::checkout::discount::compute_discount;
use souk_storefront::checkout::{
    AppliedDiscount, CreateOrderError, DestinationSource, OrderStore, Parcel, PriceBreakdown,
    ResolvedDestination,
};
use souk_storefront::db::{PgOrderStore, PgPromotionStore, RepositoryError};
use souk_storefront::models::{
    CartLine, CustomerSnapshot, DiscountKind, Eligibility, NewOrder, NewPromoCode,
    PromotionalCode,
};
use sqlx::PgPool;

const SHIPPING: Cents = Cents::new(60_000);

fn mugs(quantity: u32) -> Vec<CartLine> {
    vec![CartLine {
        product_id: ProductId::new(1),
        name: "Mug".to_string(),
        sku: Some("MUG-1".to_string()),
        category_id: Some(CategoryId::new(1)),
        unit_price: Cents::new(10_000),
        quantity,
        weight_grams: 400,
        length_cm: Some(10),
        width_cm: Some(10),
        height_cm: Some(10),
        is_physical: true,
    }]
}

fn new_order(
    user_id: Option<UserId>,
    lines: Vec<CartLine>,
    promotion: Option<AppliedDiscount>,
) -> NewOrder {
    let subtotal = lines.iter().filter_map(CartLine::line_total).sum::<Cents>();
    let discount = promotion.as_ref().map_or(Cents::ZERO, |p| p.amount);
    let total = subtotal + SHIPPING - discount;

    NewOrder {
        number_prefix: "COD".to_string(),
        user_id,
        customer: CustomerSnapshot {
            first_name: "Amina".to_string(),
            last_name: "Benali".to_string(),
            phone: Phone::parse("0551234567").unwrap(),
        },
        notes: None,
        currency: CurrencyCode::DZD,
        pricing: PriceBreakdown {
            subtotal,
            discount,
            shipping: SHIPPING,
            total,
            shipping_waived: false,
        },
        lines,
        destination: ResolvedDestination {
            region_name: "Alger".to_string(),
            sub_region_name: "Bab El Oued".to_string(),
            mode: DeliveryMode::Home,
            desk: None,
            source: DestinationSource::LocalCache,
        },
        parcel: Parcel {
            weight_kg: 1,
            length_cm: 10,
            width_cm: 10,
            height_cm: 20,
        },
        free_shipping: false,
        promotion,
    }
}

async fn create_code(
    pool: &PgPool,
    code: &str,
    usage_limit: Option<u32>,
    user_usage_limit: Option<u32>,
) -> PromotionalCode {
    PgPromotionStore::new(pool.clone())
        .create_promo_code(&NewPromoCode {
            code: PromoCode::parse(code).unwrap(),
            kind: DiscountKind::Percentage(Decimal::TEN),
            minimum_amount: None,
            maximum_discount: None,
            usage_limit,
            user_usage_limit,
            starts_at: None,
            expires_at: None,
            eligibility: Eligibility::default(),
        })
        .await
        .unwrap()
}

fn discounted(code: &PromotionalCode, user_id: Option<UserId>) -> NewOrder {
    let lines = mugs(2);
    let applied = compute_discount(code, &lines, Cents::new(20_000)).unwrap();
    new_order(user_id, lines, Some(applied))
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM storefront.{table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn counter(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT value FROM storefront.order_counter")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_orders_get_sequential_numbers(pool: PgPool) {
    let store = PgOrderStore::new(pool.clone());

    let first = store.create_order(&new_order(None, mugs(2), None)).await.unwrap();
    let second = store.create_order(&new_order(None, mugs(1), None)).await.unwrap();

    assert_eq!(first.order_number, "COD-000001");
    assert_eq!(second.order_number, "COD-000002");
    assert_eq!(first.status, OrderStatus::Pending);
    assert_eq!(counter(&pool).await, 2);
    assert_eq!(count(&pool, "order_line").await, 2);
    assert_eq!(count(&pool, "carrier_shipment").await, 2);

    let summary = store.order_summary("COD-000001").await.unwrap().unwrap();
    assert_eq!(summary.total_cents, Cents::new(80_000));
    assert_eq!(summary.shipment_status, ShipmentStatus::Pending);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_failed_line_rolls_back_order_and_counter(pool: PgPool) {
    let store = PgOrderStore::new(pool.clone());

    // The order row is written before the line breaks the quantity check.
    let err = store
        .create_order(&new_order(None, mugs(1_000), None))
        .await
        .unwrap_err();

    assert!(matches!(err, CreateOrderError::Repository(RepositoryError::Database(_))));
    assert_eq!(count(&pool, "\"order\"").await, 0);
    assert_eq!(count(&pool, "order_line").await, 0);
    assert_eq!(count(&pool, "carrier_shipment").await, 0);
    assert_eq!(counter(&pool).await, 0);

    let next = store.create_order(&new_order(None, mugs(1), None)).await.unwrap();
    assert_eq!(next.order_number, "COD-000001");
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_global_limit_is_enforced_by_the_transaction(pool: PgPool) {
    let store = PgOrderStore::new(pool.clone());
    let code = create_code(&pool, "LIMITED", Some(1), None).await;

    // Both orders were priced while one use was left.
    store.create_order(&discounted(&code, None)).await.unwrap();
    let err = store.create_order(&discounted(&code, None)).await.unwrap_err();

    assert!(matches!(err, CreateOrderError::PromoCodeExhausted));
    let used: i32 = sqlx::query_scalar("SELECT used_count FROM storefront.promo_code WHERE id = $1")
        .bind(code.id.as_i32())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(used, 1);
    assert_eq!(count(&pool, "promo_code_usage").await, 1);
    assert_eq!(count(&pool, "\"order\"").await, 1);
    assert_eq!(counter(&pool).await, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_concurrent_orders_share_the_user_limit(pool: PgPool) {
    let store = PgOrderStore::new(pool.clone());
    let code = create_code(&pool, "ONCE", None, Some(1)).await;
    let amina = Some(UserId::new(7));

    let first = discounted(&code, amina);
    let second = discounted(&code, amina);
    let (a, b) = tokio::join!(store.create_order(&first), store.create_order(&second));

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(CreateOrderError::PromoCodeUserLimit)))
    );
    assert_eq!(count(&pool, "promo_code_usage").await, 1);

    // Another user and a guest are still admitted.
    store
        .create_order(&discounted(&code, Some(UserId::new(8))))
        .await
        .unwrap();
    store.create_order(&discounted(&code, None)).await.unwrap();
    assert_eq!(count(&pool, "promo_code_usage").await, 3);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_carrier_attempts_append_to_audit(pool: PgPool) {
    let store = PgOrderStore::new(pool.clone());
    let order = store.create_order(&new_order(None, mugs(2), None)).await.unwrap();

    let submitted = ShipmentUpdate {
        status: ShipmentStatus::Submitted,
        tracking: Some("YAL-42".to_string()),
        label_url: Some("https://l/42.pdf".to_string()),
        attempt: CarrierAttempt {
            request: json!({"order_number": order.order_number}),
            response: Some(json!({"tracking": "YAL-42"})),
            error: None,
            attempted_at: Utc::now(),
        },
    };
    store.record_carrier_attempt(order.id, &submitted).await.unwrap();

    let summary = store.order_summary(&order.order_number).await.unwrap().unwrap();
    assert_eq!(summary.status, OrderStatus::Submitted);
    assert_eq!(summary.shipment_status, ShipmentStatus::Submitted);
    assert_eq!(summary.tracking.as_deref(), Some("YAL-42"));

    // A later failure is audited without losing the tracking number.
    let failed = ShipmentUpdate {
        status: ShipmentStatus::Failed,
        tracking: None,
        label_url: None,
        attempt: CarrierAttempt {
            request: json!({"order_number": order.order_number}),
            response: Some(json!({"status": 503, "body": "Service Unavailable"})),
            error: Some("carrier rejected the shipment (503): Service Unavailable".to_string()),
            attempted_at: Utc::now(),
        },
    };
    store.record_carrier_attempt(order.id, &failed).await.unwrap();

    let audit: serde_json::Value =
        sqlx::query_scalar("SELECT audit FROM storefront.carrier_shipment WHERE order_id = $1")
            .bind(order.id.as_i32())
            .fetch_one(&pool)
            .await
            .unwrap();
    let attempts = audit.as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1]["response"]["status"], 503);

    let summary = store.order_summary(&order.order_number).await.unwrap().unwrap();
    assert_eq!(summary.shipment_status, ShipmentStatus::Failed);
    assert_eq!(summary.tracking.as_deref(), Some("YAL-42"));
}
