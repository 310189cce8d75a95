//! Integration test support for the Souk checkout pipeline.
//!
//! Every collaborator of the orchestrator has an in-memory counterpart here:
//!
//! - [`MemoryDatabase`] - catalog, location cache, shipping rates, promotional
//!   codes and orders behind one lock. `create_order` works on a copy of the
//!   tables and only swaps it in at the end, like a transaction, and can be
//!   told to fail at the order-line step.
//! - [`MemoryDirectory`] - remote destination directory
//! - [`RecordingCarrier`] - carrier that accepts, rejects, or is disabled
//! - [`RecordingNotifier`] - notifier that remembers what it was asked to send
//!
//! [`TestShop`] wires them into a [`CheckoutService`] or a full axum router
//! seeded with a small reference shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souk-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use souk_core::{
    CategoryId, Cents, CurrencyCode, DeliveryMode, DeskId, OrderId, OrderStatus, Phone, ProductId,
    PromoCode, PromoCodeId, RegionId, ShipmentId, ShipmentStatus, SubRegionId, UserId,
};
use souk_storefront::carrier::{
    CarrierAttempt, CarrierError, CarrierGateway, CarrierReceipt, ShipmentPayload, ShipmentUpdate,
};
use souk_storefront::checkout::request::{CartItemInput, CustomerInput, DeliveryInput};
use souk_storefront::checkout::{
    AddressResolver, CatalogReader, CheckoutCollaborators, CheckoutRequest, CheckoutService,
    CheckoutSettings, CreateOrderError, DeliveryTarget, DiscountEngine, LocationCache, OrderStore,
    PriceBreakdown, PromotionStore, ShippingRates,
};
use souk_storefront::db::RepositoryError;
use souk_storefront::directory::{DirectoryEntry, DirectoryError, DirectoryProvider};
use souk_storefront::models::location::names_match;
use souk_storefront::models::order::format_order_number;
use souk_storefront::models::{
    CartLine, CatalogProduct, Desk, DiscountKind, Eligibility, NewOrder, OrderSummary,
    PersistedOrder, PromotionalCode, Region, ShippingRate, SubRegion,
};
use souk_storefront::routes;
use souk_storefront::services::{NewOrderNotification, Notifier, NotifyError};
use souk_storefront::state::AppState;

// =============================================================================
// In-memory database
// =============================================================================

/// An order row.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub user_id: Option<UserId>,
    pub currency: CurrencyCode,
    pub pricing: PriceBreakdown,
    pub created_at: DateTime<Utc>,
}

/// A carrier shipment row with its audit trail.
#[derive(Debug, Clone)]
pub struct StoredShipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub delivery_mode: DeliveryMode,
    pub desk_id: Option<DeskId>,
    pub free_shipping: bool,
    pub status: ShipmentStatus,
    pub tracking: Option<String>,
    pub label_url: Option<String>,
    pub audit: Vec<CarrierAttempt>,
}

/// A promotional code usage ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoUsage {
    pub code_id: PromoCodeId,
    pub user_id: Option<UserId>,
    pub order_id: OrderId,
    pub discount: Cents,
}

/// All tables of the in-memory database.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub products: HashMap<ProductId, CatalogProduct>,
    pub regions: Vec<Region>,
    pub sub_regions: Vec<SubRegion>,
    pub desks: Vec<Desk>,
    pub rates: Vec<ShippingRate>,
    pub promo_codes: Vec<PromotionalCode>,
    pub promo_usages: Vec<PromoUsage>,
    pub order_counter: i64,
    pub orders: Vec<StoredOrder>,
    pub order_lines: Vec<(OrderId, CartLine)>,
    pub shipments: Vec<StoredShipment>,
}

impl Tables {
    pub fn promo_code(&self, code: &str) -> &PromotionalCode {
        self.promo_codes
            .iter()
            .find(|c| c.code.as_str() == code)
            .unwrap()
    }

    pub fn shipment_for(&self, order_id: OrderId) -> &StoredShipment {
        self.shipments
            .iter()
            .find(|s| s.order_id == order_id)
            .unwrap()
    }
}

fn injected(what: &str) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Protocol(format!("injected failure: {what}")))
}

/// In-memory stand-in for the `PostgreSQL` repositories.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    fail_order_lines: AtomicBool,
    fail_location_cache: AtomicBool,
    fail_carrier_record: AtomicBool,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new(tables: Tables) -> Self {
        Self {
            tables: Mutex::new(tables),
            ..Self::default()
        }
    }

    /// Copy of the current tables.
    pub fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    /// Change the tables in place.
    pub fn update(&self, f: impl FnOnce(&mut Tables)) {
        f(&mut self.tables.lock().unwrap());
    }

    /// Make `create_order` fail while writing order lines.
    pub fn fail_order_lines(&self, fail: bool) {
        self.fail_order_lines.store(fail, Ordering::SeqCst);
    }

    /// Make every location cache read fail.
    pub fn fail_location_cache(&self, fail: bool) {
        self.fail_location_cache.store(fail, Ordering::SeqCst);
    }

    /// Make `record_carrier_attempt` fail.
    pub fn fail_carrier_record(&self, fail: bool) {
        self.fail_carrier_record.store(fail, Ordering::SeqCst);
    }

    fn location_tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepositoryError> {
        if self.fail_location_cache.load(Ordering::SeqCst) {
            return Err(injected("location cache"));
        }
        Ok(self.tables.lock().unwrap())
    }
}

#[async_trait]
impl CatalogReader for MemoryDatabase {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CatalogProduct>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl LocationCache for MemoryDatabase {
    async fn active_region_by_name(&self, name: &str) -> Result<Option<Region>, RepositoryError> {
        let tables = self.location_tables()?;
        Ok(tables
            .regions
            .iter()
            .find(|r| r.is_active && names_match(&r.name, name))
            .cloned())
    }

    async fn active_sub_region_by_name(
        &self,
        region_id: RegionId,
        name: &str,
    ) -> Result<Option<SubRegion>, RepositoryError> {
        let tables = self.location_tables()?;
        Ok(tables
            .sub_regions
            .iter()
            .find(|s| s.is_active && s.region_id == region_id && names_match(&s.name, name))
            .cloned())
    }

    async fn first_active_sub_region(
        &self,
        region_id: RegionId,
    ) -> Result<Option<SubRegion>, RepositoryError> {
        let tables = self.location_tables()?;
        Ok(tables
            .sub_regions
            .iter()
            .filter(|s| s.is_active && s.region_id == region_id)
            .min_by_key(|s| (s.name.to_lowercase(), s.id))
            .cloned())
    }

    async fn desk_by_id(&self, id: DeskId) -> Result<Option<Desk>, RepositoryError> {
        let tables = self.location_tables()?;
        Ok(tables.desks.iter().find(|d| d.id == id).cloned())
    }

    async fn active_regions(&self) -> Result<Vec<Region>, RepositoryError> {
        let tables = self.location_tables()?;
        let mut regions: Vec<_> = tables.regions.iter().filter(|r| r.is_active).cloned().collect();
        regions.sort_by_key(|r| r.name.to_lowercase());
        Ok(regions)
    }

    async fn active_sub_regions(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<SubRegion>, RepositoryError> {
        let tables = self.location_tables()?;
        let mut subs: Vec<_> = tables
            .sub_regions
            .iter()
            .filter(|s| s.is_active && s.region_id == region_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.name.to_lowercase());
        Ok(subs)
    }

    async fn active_desks(&self, region_id: RegionId) -> Result<Vec<Desk>, RepositoryError> {
        let tables = self.location_tables()?;
        Ok(tables
            .desks
            .iter()
            .filter(|d| d.is_active && d.region_id == region_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ShippingRates for MemoryDatabase {
    async fn rate_for_region(
        &self,
        region_name: &str,
    ) -> Result<Option<ShippingRate>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let Some(region) = tables.regions.iter().find(|r| names_match(&r.name, region_name)) else {
            return Ok(None);
        };
        Ok(tables.rates.iter().find(|r| r.region_id == region.id).copied())
    }
}

#[async_trait]
impl PromotionStore for MemoryDatabase {
    async fn code_by_name(
        &self,
        code: &PromoCode,
    ) -> Result<Option<PromotionalCode>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.promo_codes.iter().find(|c| &c.code == code).cloned())
    }

    async fn user_usage_count(
        &self,
        code_id: PromoCodeId,
        user_id: UserId,
    ) -> Result<u32, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let count = tables
            .promo_usages
            .iter()
            .filter(|u| u.code_id == code_id && u.user_id == Some(user_id))
            .count();
        Ok(u32::try_from(count).unwrap())
    }
}

#[async_trait]
impl OrderStore for MemoryDatabase {
    async fn create_order(&self, order: &NewOrder) -> Result<PersistedOrder, CreateOrderError> {
        let mut guard = self.tables.lock().unwrap();
        // Work on a copy; dropping it is the rollback.
        let mut tx = guard.clone();

        tx.order_counter += 1;
        let order_number = format_order_number(&order.number_prefix, tx.order_counter);
        let id = OrderId::new(i32::try_from(tx.orders.len() + 1).unwrap());
        let created_at = Utc::now();

        tx.orders.push(StoredOrder {
            id,
            order_number: order_number.clone(),
            status: OrderStatus::Pending,
            user_id: order.user_id,
            currency: order.currency,
            pricing: order.pricing,
            created_at,
        });

        if self.fail_order_lines.load(Ordering::SeqCst) {
            return Err(injected("order lines").into());
        }
        tx.order_lines
            .extend(order.lines.iter().map(|line| (id, line.clone())));

        let shipment_id = ShipmentId::new(i32::try_from(tx.shipments.len() + 1).unwrap());
        tx.shipments.push(StoredShipment {
            id: shipment_id,
            order_id: id,
            delivery_mode: order.destination.mode,
            desk_id: order.destination.desk.as_ref().map(|d| d.id),
            free_shipping: order.free_shipping,
            status: ShipmentStatus::Pending,
            tracking: None,
            label_url: None,
            audit: Vec::new(),
        });

        if let Some(applied) = &order.promotion {
            let code = tx
                .promo_codes
                .iter_mut()
                .find(|c| c.id == applied.code_id)
                .ok_or(RepositoryError::NotFound)?;
            if code.usage_limit.is_some_and(|limit| code.used_count >= limit) {
                return Err(CreateOrderError::PromoCodeExhausted);
            }
            code.used_count += 1;
            if let (Some(user_id), Some(limit)) = (order.user_id, applied.user_usage_limit) {
                let used = tx
                    .promo_usages
                    .iter()
                    .filter(|u| u.code_id == applied.code_id && u.user_id == Some(user_id))
                    .count();
                if u32::try_from(used).unwrap() >= limit {
                    return Err(CreateOrderError::PromoCodeUserLimit);
                }
            }
            tx.promo_usages.push(PromoUsage {
                code_id: applied.code_id,
                user_id: order.user_id,
                order_id: id,
                discount: applied.amount,
            });
        }

        *guard = tx;

        Ok(PersistedOrder {
            id,
            order_number,
            shipment_id,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    async fn record_carrier_attempt(
        &self,
        order_id: OrderId,
        update: &ShipmentUpdate,
    ) -> Result<(), RepositoryError> {
        if self.fail_carrier_record.load(Ordering::SeqCst) {
            return Err(injected("carrier record"));
        }
        let mut tables = self.tables.lock().unwrap();

        let shipment = tables
            .shipments
            .iter_mut()
            .find(|s| s.order_id == order_id)
            .ok_or(RepositoryError::NotFound)?;
        shipment.status = update.status;
        if update.tracking.is_some() {
            shipment.tracking.clone_from(&update.tracking);
        }
        if update.label_url.is_some() {
            shipment.label_url.clone_from(&update.label_url);
        }
        shipment.audit.push(update.attempt.clone());

        if update.status == ShipmentStatus::Submitted
            && let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id)
            && order.status == OrderStatus::Pending
        {
            order.status = OrderStatus::Submitted;
        }
        Ok(())
    }

    async fn order_summary(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderSummary>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let Some(order) = tables.orders.iter().find(|o| o.order_number == order_number) else {
            return Ok(None);
        };
        let shipment = tables.shipment_for(order.id);

        Ok(Some(OrderSummary {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            subtotal_cents: order.pricing.subtotal,
            discount_cents: order.pricing.discount,
            shipping_cents: order.pricing.shipping,
            total_cents: order.pricing.total,
            currency: order.currency.to_string(),
            created_at: order.created_at,
            shipment_status: shipment.status,
            tracking: shipment.tracking.clone(),
            label_url: shipment.label_url.clone(),
        }))
    }
}

// =============================================================================
// Remote directory
// =============================================================================

/// In-memory remote directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    pub regions: Vec<DirectoryEntry>,
    pub sub_regions: HashMap<String, Vec<DirectoryEntry>>,
    pub unavailable: AtomicBool,
    pub calls: AtomicUsize,
}

impl MemoryDirectory {
    /// A directory that knows one region the local cache does not.
    #[must_use]
    pub fn with_djelfa() -> Self {
        let entry = |id: &str, name: &str| DirectoryEntry {
            id: id.to_string(),
            name: name.to_string(),
        };
        Self {
            regions: vec![entry("17", "Djelfa"), entry("16", "Alger")],
            sub_regions: HashMap::from([(
                "17".to_string(),
                vec![entry("1701", "Djelfa"), entry("1702", "Messaad")],
            )]),
            ..Self::default()
        }
    }

    fn call(&self) -> Result<(), DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Status(503));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryProvider for MemoryDirectory {
    async fn regions(&self) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.call()?;
        Ok(self.regions.clone())
    }

    async fn sub_regions(&self, region_id: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.call()?;
        Ok(self.sub_regions.get(region_id).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Carrier and notifier
// =============================================================================

/// How the fake carrier answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierMode {
    Accept,
    Reject,
    Disabled,
}

/// Carrier that records every payload it receives.
#[derive(Debug)]
pub struct RecordingCarrier {
    mode: CarrierMode,
    submitted: Mutex<Vec<ShipmentPayload>>,
}

impl RecordingCarrier {
    #[must_use]
    pub const fn new(mode: CarrierMode) -> Self {
        Self {
            mode,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<ShipmentPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CarrierGateway for RecordingCarrier {
    fn is_enabled(&self) -> bool {
        self.mode != CarrierMode::Disabled
    }

    async fn submit(&self, payload: &ShipmentPayload) -> Result<CarrierReceipt, CarrierError> {
        self.submitted.lock().unwrap().push(payload.clone());
        match self.mode {
            CarrierMode::Accept => {
                let tracking = format!("TRK-{}", payload.order_number);
                Ok(CarrierReceipt {
                    label_url: Some(format!("https://labels.carrier.test/{tracking}.pdf")),
                    raw: json!({ "tracking": tracking, "success": true }),
                    tracking,
                })
            }
            CarrierMode::Reject => Err(CarrierError::Rejected {
                status: 422,
                body: "{\"error\":\"commune inconnue\"}".to_string(),
            }),
            CarrierMode::Disabled => Err(CarrierError::Disabled),
        }
    }
}

/// Notifier that records what it sends.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub failing: AtomicBool,
    admin: Mutex<Vec<NewOrderNotification>>,
    customer: Mutex<Vec<(UserId, String, Cents)>>,
}

impl RecordingNotifier {
    pub fn admin(&self) -> Vec<NewOrderNotification> {
        self.admin.lock().unwrap().clone()
    }

    pub fn customer(&self) -> Vec<(UserId, String, Cents)> {
        self.customer.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_admin_new_order(
        &self,
        notification: &NewOrderNotification,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(502));
        }
        self.admin.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn notify_customer_order_placed(
        &self,
        user_id: UserId,
        order_number: &str,
        total_cents: Cents,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(502));
        }
        self.customer
            .lock()
            .unwrap()
            .push((user_id, order_number.to_string(), total_cents));
        Ok(())
    }
}

// =============================================================================
// Reference shop
// =============================================================================

pub const MUG: ProductId = ProductId::new(1);
pub const POSTER: ProductId = ProductId::new(2);
pub const EBOOK: ProductId = ProductId::new(3);
pub const LAMP: ProductId = ProductId::new(4);

pub const ALGER: RegionId = RegionId::new(16);
pub const BLIDA: RegionId = RegionId::new(9);
pub const ORAN: RegionId = RegionId::new(31);
pub const TAMANRASSET: RegionId = RegionId::new(11);

pub const ALGER_DESK: DeskId = DeskId::new(501);
pub const BLIDA_DESK: DeskId = DeskId::new(502);
pub const ORAN_DESK: DeskId = DeskId::new(503);
pub const CLOSED_DESK: DeskId = DeskId::new(504);

const DECOR: CategoryId = CategoryId::new(4);

fn product(
    id: ProductId,
    name: &str,
    price: i64,
    grams: i32,
    dims: Option<(i32, i32, i32)>,
) -> CatalogProduct {
    CatalogProduct {
        id,
        name: name.to_string(),
        sku: Some(format!("SKU-{id}")),
        price_cents: Some(Cents::new(price)),
        category_id: None,
        is_active: true,
        is_physical: true,
        weight_grams: grams,
        length_cm: dims.map(|d| d.0),
        width_cm: dims.map(|d| d.1),
        height_cm: dims.map(|d| d.2),
    }
}

fn promo(id: i32, code: &str, kind: DiscountKind) -> PromotionalCode {
    PromotionalCode {
        id: PromoCodeId::new(id),
        code: PromoCode::parse(code).unwrap(),
        kind,
        minimum_amount: None,
        maximum_discount: None,
        usage_limit: None,
        used_count: 0,
        user_usage_limit: None,
        is_active: true,
        starts_at: Utc::now() - Duration::days(1),
        expires_at: None,
        eligibility: Eligibility::default(),
    }
}

/// Catalog, locations, rates and codes used across the tests.
///
/// - Mug: 100.00, 400 g, 10x10x10 cm. Poster: 25.00, 200 g. E-book: digital.
///   Lamp: 60.00, 2.5 kg, category "decor".
/// - Alger has a sub-region named Alger; Blida has none; Oran has no
///   sub-regions at all; Tamanrasset has no shipping rate.
/// - Codes: `SAVE10` (10%), `SAVE50` (50%, capped at 10.00), `BIG` (10%,
///   minimum 300.00), `LIMITED` (5.00, one use), `ONCE` (10%, one per user),
///   `FREESHIP`, `DECOR20` (20% on decor only), `EXPIRED`.
#[must_use]
pub fn reference_tables() -> Tables {
    let mut ebook = product(EBOOK, "E-book", 1_500, 1, None);
    ebook.is_physical = false;
    let mut lamp = product(LAMP, "Lamp", 6_000, 2_500, Some((30, 20, 20)));
    lamp.category_id = Some(DECOR);

    let region = |id: RegionId, name: &str| Region {
        id,
        name: name.to_string(),
        code: Some(id.to_string()),
        is_active: true,
    };
    let sub_region = |id: i32, region_id: RegionId, name: &str| SubRegion {
        id: SubRegionId::new(id),
        region_id,
        name: name.to_string(),
        is_active: true,
    };
    let desk = |id: DeskId, region_id: RegionId, name: &str, is_active: bool| Desk {
        id,
        region_id,
        name: name.to_string(),
        address: None,
        is_active,
    };
    let rate = |region_id: RegionId, home: i64, desk: i64| ShippingRate {
        region_id,
        home_cents: Cents::new(home),
        desk_cents: Cents::new(desk),
        included_kg: 5,
        extra_kg_cents: Cents::new(5_000),
    };

    let mut save50 = promo(2, "SAVE50", DiscountKind::Percentage(Decimal::from(50)));
    save50.maximum_discount = Some(Cents::new(1_000));
    let mut big = promo(3, "BIG", DiscountKind::Percentage(Decimal::TEN));
    big.minimum_amount = Some(Cents::new(30_000));
    let mut limited = promo(4, "LIMITED", DiscountKind::FixedAmount(Cents::new(500)));
    limited.usage_limit = Some(1);
    let mut once = promo(5, "ONCE", DiscountKind::Percentage(Decimal::TEN));
    once.user_usage_limit = Some(1);
    let mut decor = promo(7, "DECOR20", DiscountKind::Percentage(Decimal::from(20)));
    decor.eligibility.applicable_categories = vec![DECOR];
    let mut expired = promo(8, "EXPIRED", DiscountKind::Percentage(Decimal::TEN));
    expired.expires_at = Some(Utc::now() - Duration::hours(1));

    Tables {
        products: [
            product(MUG, "Mug", 10_000, 400, Some((10, 10, 10))),
            product(POSTER, "Poster", 2_500, 200, None),
            ebook,
            lamp,
        ]
        .into_iter()
        .map(|p| (p.id, p))
        .collect(),
        regions: vec![
            region(ALGER, "Alger"),
            region(BLIDA, "Blida"),
            region(ORAN, "Oran"),
            region(TAMANRASSET, "Tamanrasset"),
        ],
        sub_regions: vec![
            sub_region(1602, ALGER, "Bab El Oued"),
            sub_region(1601, ALGER, "Alger"),
            sub_region(902, BLIDA, "Ouled Yaich"),
            sub_region(901, BLIDA, "Boufarik"),
            sub_region(1101, TAMANRASSET, "In Salah"),
        ],
        desks: vec![
            desk(ALGER_DESK, ALGER, "Alger Centre", true),
            desk(BLIDA_DESK, BLIDA, "Blida Ville", true),
            desk(ORAN_DESK, ORAN, "Oran Es Senia", true),
            desk(CLOSED_DESK, ALGER, "Hussein Dey", false),
        ],
        rates: vec![
            rate(ALGER, 60_000, 40_000),
            rate(BLIDA, 70_000, 45_000),
            rate(ORAN, 80_000, 50_000),
        ],
        promo_codes: vec![
            promo(1, "SAVE10", DiscountKind::Percentage(Decimal::TEN)),
            save50,
            big,
            limited,
            once,
            promo(6, "FREESHIP", DiscountKind::FreeShipping),
            decor,
            expired,
        ],
        ..Tables::default()
    }
}

// =============================================================================
// Request builders
// =============================================================================

#[must_use]
pub fn item(product_id: ProductId, quantity: u32) -> CartItemInput {
    CartItemInput {
        product_id,
        quantity,
        unit_price_cents: None,
    }
}

#[must_use]
pub fn home(region: &str, sub_region: &str) -> DeliveryTarget {
    DeliveryTarget::Home {
        region: region.to_string(),
        sub_region: sub_region.to_string(),
    }
}

#[must_use]
pub fn desk(region: &str, desk_id: DeskId) -> DeliveryTarget {
    DeliveryTarget::Desk {
        region: region.to_string(),
        desk_id,
    }
}

/// A valid checkout to Alger (home) with no code.
#[must_use]
pub fn checkout_request(
    cart: Vec<CartItemInput>,
    promo_code: Option<&str>,
    quoted_shipping_cents: i64,
) -> CheckoutRequest {
    CheckoutRequest {
        cart,
        customer: CustomerInput {
            first_name: "Amina".to_string(),
            last_name: "Benali".to_string(),
            phone: Phone::parse("0551234567").unwrap(),
        },
        delivery: DeliveryInput {
            target: home("Alger", "Bab El Oued"),
            free_shipping: false,
        },
        parcel_override: None,
        notes: None,
        promo_code: promo_code.map(str::to_string),
        quoted_shipping_cents,
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// A checkout service over in-memory collaborators.
pub struct TestShop {
    pub db: Arc<MemoryDatabase>,
    pub directory: Option<Arc<MemoryDirectory>>,
    pub carrier: Arc<RecordingCarrier>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: CheckoutService,
}

impl TestShop {
    /// Reference shop, accepting carrier, no remote directory.
    #[must_use]
    pub fn new() -> Self {
        Self::build(CarrierMode::Accept, None)
    }

    #[must_use]
    pub fn with_carrier(mode: CarrierMode) -> Self {
        Self::build(mode, None)
    }

    #[must_use]
    pub fn with_directory(directory: MemoryDirectory) -> Self {
        Self::build(CarrierMode::Accept, Some(Arc::new(directory)))
    }

    fn build(mode: CarrierMode, directory: Option<Arc<MemoryDirectory>>) -> Self {
        let db = Arc::new(MemoryDatabase::new(reference_tables()));
        let carrier = Arc::new(RecordingCarrier::new(mode));
        let notifier = Arc::new(RecordingNotifier::default());

        let remote: Option<Arc<dyn DirectoryProvider>> = directory
            .clone()
            .map(|d| d as Arc<dyn DirectoryProvider>);

        let deps = CheckoutCollaborators {
            catalog: db.clone(),
            resolver: AddressResolver::new(db.clone(), remote),
            discounts: DiscountEngine::new(db.clone()),
            rates: db.clone(),
            orders: db.clone(),
            carrier: carrier.clone(),
            notifier: notifier.clone(),
        };
        let settings = CheckoutSettings {
            currency: CurrencyCode::DZD,
            order_prefix: "COD".to_string(),
            from_region: Some("Alger".to_string()),
        };

        Self {
            db,
            directory,
            carrier,
            notifier,
            service: CheckoutService::new(deps, settings),
        }
    }

    /// The full HTTP application over this shop.
    ///
    /// The pool is lazy and never connects; only `/health/ready` touches it.
    #[must_use]
    pub fn app(&self) -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://souk@127.0.0.1:1/souk_test")
            .unwrap();
        let locations: Arc<dyn LocationCache> = self.db.clone();
        routes::app(AppState::new(pool, self.service.clone(), locations))
    }
}

impl Default for TestShop {
    fn default() -> Self {
        Self::new()
    }
}
