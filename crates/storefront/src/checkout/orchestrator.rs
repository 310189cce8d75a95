//! Checkout orchestrator.
//!
//! Sequences the pipeline and owns the failure policy. Each stage consumes
//! the previous stage's value, so a checkout cannot be persisted without
//! being priced or priced without being validated:
//!
//! ```text
//! CheckoutRequest -> ValidatedCheckout -> PricedCheckout -> (NewOrder, PersistedOrder) -> CheckoutOutcome
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use souk_core::{Cents, CurrencyCode, OrderId, OrderStatus, PromoCode, ShipmentStatus, UserId};
use tokio::task::JoinHandle;
use tracing::{Instrument, instrument};

use super::address::{AddressResolver, ResolvedDestination};
use super::discount::{AppliedDiscount, DiscountEngine, DiscountError, DiscountValidation};
use super::parcel::{Parcel, ParcelOverride, apply_parcel_overrides, compute_parcel};
use super::pricing::{self, PriceBreakdown};
use super::request::{CartItemInput, CheckoutRequest, PromoPreviewRequest, QuoteRequest};
use super::shipping;
use super::store::{CatalogReader, OrderStore, ShippingRates};
use super::CheckoutError;
use crate::carrier::{CarrierError, CarrierGateway, ShipmentPayload, ShipmentUpdate};
use crate::models::{CartLine, CustomerSnapshot, NewOrder, OrderSummary, PersistedOrder};
use crate::services::notifications::{NewOrderNotification, NotificationItem, Notifier};

/// Stage a checkout has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStage {
    Validating,
    Priced,
    Persisted,
    CarrierSubmitted,
    CarrierDeferred,
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validating => "VALIDATING",
            Self::Priced => "PRICED",
            Self::Persisted => "PERSISTED",
            Self::CarrierSubmitted => "CARRIER_SUBMITTED",
            Self::CarrierDeferred => "CARRIER_DEFERRED",
        };
        f.write_str(s)
    }
}

/// Store-wide checkout settings.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: CurrencyCode,
    /// Order number prefix, e.g. `COD`.
    pub order_prefix: String,
    /// Origin region announced to the carrier.
    pub from_region: Option<String>,
}

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct CheckoutCollaborators {
    pub catalog: Arc<dyn CatalogReader>,
    pub resolver: AddressResolver,
    pub discounts: DiscountEngine,
    pub rates: Arc<dyn ShippingRates>,
    pub orders: Arc<dyn OrderStore>,
    pub carrier: Arc<dyn CarrierGateway>,
    pub notifier: Arc<dyn Notifier>,
}

/// A request whose cart, destination and parcel have been checked.
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub user_id: Option<UserId>,
    pub customer: CustomerSnapshot,
    pub notes: Option<String>,
    pub lines: Vec<CartLine>,
    pub destination: ResolvedDestination,
    pub parcel: Parcel,
    pub quoted_shipping: Cents,
    pub free_shipping_requested: bool,
    pub promo_code: Option<PromoCode>,
}

/// A validated checkout with its final prices.
#[derive(Debug, Clone)]
pub struct PricedCheckout {
    pub validated: ValidatedCheckout,
    pub pricing: PriceBreakdown,
    pub promotion: Option<AppliedDiscount>,
}

/// Money summary returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingSummary {
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub shipping_cents: Cents,
    pub total_cents: Cents,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<PromoCode>,
}

/// Carrier side of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarrierSummary {
    pub payload: ShipmentPayload,
    pub tracking: Option<String>,
    pub label_url: Option<String>,
    pub status: ShipmentStatus,
    pub error: Option<String>,
}

/// Result of a successful checkout.
///
/// The order exists whatever `carrier` says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    pub order_number: String,
    pub cod_status: OrderStatus,
    pub stage: CheckoutStage,
    pub pricing: PricingSummary,
    pub carrier: CarrierSummary,
}

/// Outcome plus the handle of the post-commit notification task.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub outcome: CheckoutOutcome,
    pub side_effects: JoinHandle<()>,
}

/// Answer of the shipping quote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub shipping_cents: Cents,
    pub currency: CurrencyCode,
    pub parcel: Parcel,
    pub destination: ResolvedDestination,
}

/// Runs checkouts.
#[derive(Clone)]
pub struct CheckoutService {
    deps: CheckoutCollaborators,
    settings: CheckoutSettings,
}

impl CheckoutService {
    #[must_use]
    pub fn new(deps: CheckoutCollaborators, settings: CheckoutSettings) -> Self {
        Self { deps, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Run a full checkout.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when the order could not be created.
    /// Carrier and notification failures are not errors.
    #[instrument(skip(self, request), fields(user_id = ?user_id, mode = %request.delivery.target.mode()))]
    pub async fn submit(
        &self,
        request: &CheckoutRequest,
        user_id: Option<UserId>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        tracing::debug!(stage = %CheckoutStage::Validating, "Checkout started");
        let validated = self.validate(request, user_id).await.inspect_err(|e| {
            tracing::info!(stage = %CheckoutStage::Validating, code = e.code(), error = %e, "Checkout rejected");
        })?;

        let priced = self.price(validated).await.inspect_err(|e| {
            tracing::info!(stage = %CheckoutStage::Validating, code = e.code(), error = %e, "Checkout rejected");
        })?;
        tracing::debug!(stage = %CheckoutStage::Priced, total = %priced.pricing.total, "Checkout priced");

        let (order, persisted) = self.persist(priced).await.inspect_err(|e| {
            tracing::error!(stage = %CheckoutStage::Priced, code = e.code(), error = %e, "Order could not be persisted");
        })?;
        tracing::info!(
            stage = %CheckoutStage::Persisted,
            order_number = %persisted.order_number,
            total = %order.pricing.total,
            "Order created"
        );

        Ok(self.dispatch(&order, &persisted).await)
    }

    /// Stage 1: shape checks, catalog re-read, destination and parcel.
    ///
    /// # Errors
    ///
    /// `Validation`, `CatalogMismatch`, `InvalidDestination`, or
    /// `Persistence` if the catalog cannot be read.
    pub async fn validate(
        &self,
        request: &CheckoutRequest,
        user_id: Option<UserId>,
    ) -> Result<ValidatedCheckout, CheckoutError> {
        request.validate()?;

        let promo_code = request
            .promo_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(PromoCode::parse)
            .transpose()
            .map_err(|e| CheckoutError::Validation(format!("promo_code: {e}")))?;

        let lines = self.load_cart(&request.cart).await?;
        require_physical(&lines)?;

        let destination = self.deps.resolver.resolve(&request.delivery.target).await?;
        let parcel = build_parcel(&lines, request.parcel_override.as_ref());

        Ok(ValidatedCheckout {
            user_id,
            customer: request.customer_snapshot(),
            notes: request.trimmed_notes(),
            lines,
            destination,
            parcel,
            quoted_shipping: request.quoted_shipping(),
            free_shipping_requested: request.delivery.free_shipping,
            promo_code,
        })
    }

    /// Stage 2: discount and totals.
    ///
    /// # Errors
    ///
    /// `PromoCodeRejected` for an unusable code, `Validation` on overflow.
    pub async fn price(&self, validated: ValidatedCheckout) -> Result<PricedCheckout, CheckoutError> {
        let subtotal = pricing::subtotal(&validated.lines)?;

        let promotion = match &validated.promo_code {
            Some(code) => Some(
                self.deps
                    .discounts
                    .evaluate(code, validated.user_id, &validated.lines, subtotal, Utc::now())
                    .await??,
            ),
            None => None,
        };

        self.check_quote_drift(&validated).await;

        let (discount, waive) = promotion
            .as_ref()
            .map_or((Cents::ZERO, false), |p| (p.amount, p.waives_shipping));
        let pricing = pricing::price_order(subtotal, discount, validated.quoted_shipping, waive)?;

        Ok(PricedCheckout {
            validated,
            pricing,
            promotion,
        })
    }

    /// Stage 3: write the order atomically.
    ///
    /// # Errors
    ///
    /// `Persistence` if the transaction fails, `PromoCodeRejected` if the code
    /// ran out of uses while the order was being written.
    pub async fn persist(
        &self,
        priced: PricedCheckout,
    ) -> Result<(NewOrder, PersistedOrder), CheckoutError> {
        let PricedCheckout {
            validated,
            pricing,
            promotion,
        } = priced;

        let free_shipping = validated.free_shipping_requested || pricing.shipping_waived;
        let order = NewOrder {
            number_prefix: self.settings.order_prefix.clone(),
            user_id: validated.user_id,
            customer: validated.customer,
            notes: validated.notes,
            currency: self.settings.currency,
            pricing,
            lines: validated.lines,
            destination: validated.destination,
            parcel: validated.parcel,
            free_shipping,
            promotion,
        };

        let persisted = self.deps.orders.create_order(&order).await?;
        Ok((order, persisted))
    }

    /// Stage 4: carrier submission and notifications. Never fails.
    pub async fn dispatch(&self, order: &NewOrder, persisted: &PersistedOrder) -> CheckoutReceipt {
        let payload = ShipmentPayload::for_order(
            order,
            &persisted.order_number,
            self.settings.from_region.as_deref(),
        );

        let result = if self.deps.carrier.is_enabled() {
            self.deps.carrier.submit(&payload).await
        } else {
            Err(CarrierError::Disabled)
        };

        let update = ShipmentUpdate::from_result(&payload, &result, Utc::now());
        let recorded = self
            .deps
            .orders
            .record_carrier_attempt(persisted.id, &update)
            .await;

        let (stage, cod_status) = match &result {
            Ok(receipt) => {
                tracing::info!(
                    stage = %CheckoutStage::CarrierSubmitted,
                    order_number = %persisted.order_number,
                    tracking = %receipt.tracking,
                    "Shipment submitted"
                );
                (CheckoutStage::CarrierSubmitted, OrderStatus::Submitted)
            }
            Err(CarrierError::Disabled) => {
                tracing::info!(
                    stage = %CheckoutStage::CarrierDeferred,
                    order_number = %persisted.order_number,
                    "Carrier submission disabled, order queued for review"
                );
                (CheckoutStage::CarrierDeferred, OrderStatus::Pending)
            }
            Err(e) => {
                tracing::warn!(
                    stage = %CheckoutStage::CarrierDeferred,
                    order_number = %persisted.order_number,
                    error = %e,
                    "Carrier submission failed, order kept"
                );
                (CheckoutStage::CarrierDeferred, OrderStatus::Pending)
            }
        };

        // The outcome mirrors the stored rows, so an unrecorded attempt
        // leaves the order where the transaction put it.
        let (stage, cod_status, carrier) = match recorded {
            Ok(()) => (
                stage,
                cod_status,
                CarrierSummary {
                    payload,
                    tracking: update.tracking,
                    label_url: update.label_url,
                    status: update.status,
                    error: update.attempt.error,
                },
            ),
            Err(e) => {
                tracing::error!(
                    order_number = %persisted.order_number,
                    tracking = ?update.tracking,
                    error = %e,
                    "Failed to record carrier attempt"
                );
                let error = match &update.tracking {
                    Some(tracking) => format!(
                        "carrier accepted the parcel as {tracking} but the attempt was not recorded: {e}"
                    ),
                    None => format!("carrier attempt was not recorded: {e}"),
                };
                (
                    CheckoutStage::Persisted,
                    OrderStatus::Pending,
                    CarrierSummary {
                        payload,
                        tracking: None,
                        label_url: None,
                        status: ShipmentStatus::Pending,
                        error: Some(error),
                    },
                )
            }
        };

        let side_effects = self.spawn_notifications(order, persisted);

        let outcome = CheckoutOutcome {
            order_id: persisted.id,
            order_number: persisted.order_number.clone(),
            cod_status,
            stage,
            pricing: PricingSummary {
                subtotal_cents: order.pricing.subtotal,
                discount_cents: order.pricing.discount,
                shipping_cents: order.pricing.shipping,
                total_cents: order.pricing.total,
                currency: order.currency,
                promo_code: order.promotion.as_ref().map(|p| p.code.clone()),
            },
            carrier,
        };

        CheckoutReceipt {
            outcome,
            side_effects,
        }
    }

    /// Price shipping for a cart and destination.
    ///
    /// # Errors
    ///
    /// `Validation`, `CatalogMismatch`, or `InvalidDestination` (including a
    /// region with no shipping rate).
    #[instrument(skip(self, request))]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, CheckoutError> {
        request.validate()?;
        let lines = self.load_cart(&request.cart).await?;
        require_physical(&lines)?;

        let destination = self.deps.resolver.resolve(&request.delivery.target).await?;
        let parcel = build_parcel(&lines, request.parcel_override.as_ref());

        let shipping_cents = self
            .shipping_for(&destination, &parcel)
            .await?
            .ok_or_else(|| {
                CheckoutError::InvalidDestination(format!(
                    "no shipping rate for {}",
                    destination.region_name
                ))
            })?;

        Ok(ShippingQuote {
            shipping_cents,
            currency: self.settings.currency,
            parcel,
            destination,
        })
    }

    /// Check a code against a cart without recording anything.
    ///
    /// # Errors
    ///
    /// `Validation`, `CatalogMismatch`, or `Persistence` on lookup failure.
    #[instrument(skip(self, request))]
    pub async fn preview_code(
        &self,
        request: &PromoPreviewRequest,
        user_id: Option<UserId>,
    ) -> Result<DiscountValidation, CheckoutError> {
        request.validate()?;
        let lines = self.load_cart(&request.cart).await?;
        let subtotal = pricing::subtotal(&lines)?;

        let Ok(code) = PromoCode::parse(&request.code) else {
            return Ok(DiscountValidation::from(Err(DiscountError::CodeNotFound)));
        };

        Ok(self
            .deps
            .discounts
            .validate_code(&code, user_id, &lines, subtotal, Utc::now())
            .await?)
    }

    /// Look up an order for the confirmation page.
    ///
    /// # Errors
    ///
    /// `Persistence` on lookup failure.
    pub async fn order_summary(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderSummary>, CheckoutError> {
        Ok(self.deps.orders.order_summary(order_number).await?)
    }

    /// Re-read the cart from the catalog.
    ///
    /// Products that are missing, unsellable, or whose price differs from
    /// the one the client displayed are collected and reported together.
    async fn load_cart(&self, items: &[CartItemInput]) -> Result<Vec<CartLine>, CheckoutError> {
        let ids: Vec<_> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<_, _> = self
            .deps
            .catalog
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(items.len());
        let mut mismatched = Vec::new();
        for item in items {
            let line = products
                .get(&item.product_id)
                .and_then(|p| CartLine::from_catalog(p, item.quantity))
                .filter(|l| {
                    item.unit_price_cents
                        .is_none_or(|client| client == l.unit_price.as_i64())
                });
            match line {
                Some(line) => lines.push(line),
                None => mismatched.push(item.product_id),
            }
        }

        if mismatched.is_empty() {
            Ok(lines)
        } else {
            Err(CheckoutError::CatalogMismatch(mismatched))
        }
    }

    async fn shipping_for(
        &self,
        destination: &ResolvedDestination,
        parcel: &Parcel,
    ) -> Result<Option<Cents>, CheckoutError> {
        let Some(rate) = self
            .deps
            .rates
            .rate_for_region(&destination.region_name)
            .await?
        else {
            return Ok(None);
        };
        Ok(shipping::quote(&rate, destination.mode, parcel))
    }

    /// Log when the quoted shipping no longer matches the rate table.
    ///
    /// The quoted figure is still what gets charged.
    async fn check_quote_drift(&self, validated: &ValidatedCheckout) {
        match self
            .shipping_for(&validated.destination, &validated.parcel)
            .await
        {
            Ok(Some(current)) if current != validated.quoted_shipping => {
                tracing::warn!(
                    quoted = %validated.quoted_shipping,
                    current = %current,
                    region = %validated.destination.region_name,
                    "Quoted shipping differs from current rate"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Shipping drift check skipped"),
        }
    }

    fn spawn_notifications(&self, order: &NewOrder, persisted: &PersistedOrder) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.deps.notifier);
        let notification = NewOrderNotification {
            order_number: persisted.order_number.clone(),
            customer_name: order.customer.full_name(),
            total_cents: order.pricing.total,
            currency: order.currency,
            user_id: order.user_id,
            items: order
                .lines
                .iter()
                .map(|l| NotificationItem {
                    name: l.name.clone(),
                    quantity: l.quantity,
                })
                .collect(),
        };
        let span = tracing::info_span!("order_notifications", order_number = %persisted.order_number);

        tokio::spawn(
            async move {
                if let Err(e) = notifier.notify_admin_new_order(&notification).await {
                    tracing::warn!(error = %e, "Admin notification failed");
                }
                if let Some(user_id) = notification.user_id
                    && let Err(e) = notifier
                        .notify_customer_order_placed(
                            user_id,
                            &notification.order_number,
                            notification.total_cents,
                        )
                        .await
                {
                    tracing::warn!(error = %e, "Customer notification failed");
                }
            }
            .instrument(span),
        )
    }
}

fn require_physical(lines: &[CartLine]) -> Result<(), CheckoutError> {
    if lines.iter().any(|l| l.is_physical) {
        Ok(())
    } else {
        Err(CheckoutError::Validation(
            "cart has no physical items to ship".to_string(),
        ))
    }
}

fn build_parcel(lines: &[CartLine], override_: Option<&ParcelOverride>) -> Parcel {
    let computed = compute_parcel(lines);
    override_.map_or(computed, |o| apply_parcel_overrides(computed, o))
}
