//! Order repository.
//!
//! `create_order` is the only place orders come into existence. The order
//! row, its lines, its carrier shipment, the order counter and the
//! promotional code usage are written in a single transaction; dropping the
//! transaction on any error rolls all of it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souk_core::{OrderId, OrderStatus, PaymentMethod, ShipmentId, ShipmentStatus};
use sqlx::{PgPool, Postgres, Transaction};

use super::{RepositoryError, map_unique_violation};
use crate::carrier::{ShipmentPayload, ShipmentUpdate};
use crate::checkout::store::{CreateOrderError, OrderStore};
use crate::checkout::AppliedDiscount;
use crate::models::order::format_order_number;
use crate::models::{NewOrder, OrderSummary, PersistedOrder};

/// `PostgreSQL` order store.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_int(value: u32, what: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{what} out of range: {value}")))
}

/// Take the next running number. Rolls back with the transaction.
async fn next_order_number(
    tx: &mut Transaction<'_, Postgres>,
    prefix: &str,
) -> Result<String, RepositoryError> {
    let value: i64 = sqlx::query_scalar(
        "UPDATE storefront.order_counter SET value = value + 1 WHERE id RETURNING value",
    )
    .fetch_one(&mut **tx)
    .await?;

    Ok(format_order_number(prefix, value))
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder,
    order_number: &str,
) -> Result<(OrderId, DateTime<Utc>), RepositoryError> {
    let pricing = &order.pricing;

    let row: (OrderId, DateTime<Utc>) = sqlx::query_as(
        r#"
        INSERT INTO storefront."order" (
            order_number, user_id, status, payment_method, currency,
            subtotal_cents, discount_cents, shipping_cents, total_cents,
            subtotal, discount, shipping, total,
            customer_first_name, customer_last_name, customer_phone, notes, promo_code_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING id, created_at
        "#,
    )
    .bind(order_number)
    .bind(order.user_id)
    .bind(OrderStatus::Pending)
    .bind(PaymentMethod::Cod)
    .bind(order.currency.code())
    .bind(pricing.subtotal)
    .bind(pricing.discount)
    .bind(pricing.shipping)
    .bind(pricing.total)
    .bind(pricing.subtotal.to_decimal())
    .bind(pricing.discount.to_decimal())
    .bind(pricing.shipping.to_decimal())
    .bind(pricing.total.to_decimal())
    .bind(&order.customer.first_name)
    .bind(&order.customer.last_name)
    .bind(order.customer.phone.as_str())
    .bind(order.notes.as_deref())
    .bind(order.promotion.as_ref().map(|p| p.code_id))
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_unique_violation(e, "order number"))?;

    Ok(row)
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    order: &NewOrder,
) -> Result<(), RepositoryError> {
    for line in &order.lines {
        let line_total = line.line_total().ok_or_else(|| {
            RepositoryError::DataCorruption(format!("line total overflow for {}", line.product_id))
        })?;

        sqlx::query(
            r"
            INSERT INTO storefront.order_line (
                order_id, product_id, name, sku, unit_price_cents, unit_price,
                quantity, line_total_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.sku.as_deref())
        .bind(line.unit_price)
        .bind(line.unit_price.to_decimal())
        .bind(db_int(line.quantity, "quantity")?)
        .bind(line_total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_shipment(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    order: &NewOrder,
    payload: &ShipmentPayload,
) -> Result<ShipmentId, RepositoryError> {
    let desk_name = order
        .destination
        .desk
        .as_ref()
        .and_then(|d| d.name.as_deref());

    let id: ShipmentId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.carrier_shipment (
            order_id, first_name, last_name, phone, region, sub_region, delivery_mode,
            desk_id, desk_name, product_list, declared_value_cents, cod_amount_cents,
            weight_kg, length_cm, width_cm, height_cm, free_shipping, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.phone)
    .bind(&payload.region)
    .bind(&payload.sub_region)
    .bind(payload.delivery_mode)
    .bind(payload.desk_id)
    .bind(desk_name)
    .bind(&payload.product_list)
    .bind(payload.declared_value_cents)
    .bind(payload.cod_amount_cents)
    .bind(db_int(payload.weight_kg, "weight")?)
    .bind(db_int(payload.length_cm, "length")?)
    .bind(db_int(payload.width_cm, "width")?)
    .bind(db_int(payload.height_cm, "height")?)
    .bind(payload.free_shipping)
    .bind(ShipmentStatus::Pending)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Consume one use of the code and write the ledger entry.
///
/// The conditional increment locks the code row, so concurrent orders for
/// the same code queue here and the per-user count below sees every
/// committed use.
async fn apply_promotion(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    order: &NewOrder,
    promotion: &AppliedDiscount,
) -> Result<(), CreateOrderError> {
    let updated = sqlx::query(
        r"
        UPDATE storefront.promo_code
        SET used_count = used_count + 1
        WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)
        ",
    )
    .bind(promotion.code_id)
    .execute(&mut **tx)
    .await
    .map_err(RepositoryError::from)?
    .rows_affected();

    if updated == 0 {
        tracing::info!(code = %promotion.code, "Promotional code ran out during checkout");
        return Err(CreateOrderError::PromoCodeExhausted);
    }

    if let (Some(user_id), Some(limit)) = (order.user_id, promotion.user_usage_limit) {
        let used: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM storefront.promo_code_usage
            WHERE promo_code_id = $1 AND user_id = $2
            ",
        )
        .bind(promotion.code_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;

        if used >= i64::from(limit) {
            tracing::info!(code = %promotion.code, user_id = %user_id, "Promotional code user limit reached during checkout");
            return Err(CreateOrderError::PromoCodeUserLimit);
        }
    }

    sqlx::query(
        r"
        INSERT INTO storefront.promo_code_usage (promo_code_id, order_id, user_id, discount_cents)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(promotion.code_id)
    .bind(order_id)
    .bind(order.user_id)
    .bind(promotion.amount)
    .execute(&mut **tx)
    .await
    .map_err(RepositoryError::from)?;

    Ok(())
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(&self, order: &NewOrder) -> Result<PersistedOrder, CreateOrderError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let order_number = next_order_number(&mut tx, &order.number_prefix).await?;
        let (order_id, created_at) = insert_order(&mut tx, order, &order_number).await?;
        insert_lines(&mut tx, order_id, order).await?;

        let payload = ShipmentPayload::for_order(order, &order_number, None);
        let shipment_id = insert_shipment(&mut tx, order_id, order, &payload).await?;

        if let Some(promotion) = &order.promotion {
            apply_promotion(&mut tx, order_id, order, promotion).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(PersistedOrder {
            id: order_id,
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
        let attempt = serde_json::to_value(&update.attempt)
            .map_err(|e| RepositoryError::DataCorruption(format!("carrier attempt: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE storefront.carrier_shipment
            SET status = $2,
                tracking = COALESCE($3, tracking),
                label_url = COALESCE($4, label_url),
                audit = audit || jsonb_build_array($5::jsonb),
                updated_at = NOW()
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .bind(update.status)
        .bind(update.tracking.as_deref())
        .bind(update.label_url.as_deref())
        .bind(sqlx::types::Json(attempt))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }

        if update.status == ShipmentStatus::Submitted {
            sqlx::query(
                r#"
                UPDATE storefront."order"
                SET status = $2, updated_at = NOW()
                WHERE id = $1 AND status = $3
                "#,
            )
            .bind(order_id)
            .bind(OrderStatus::Submitted)
            .bind(OrderStatus::Pending)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn order_summary(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderSummary>, RepositoryError> {
        let summary = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT o.id, o.order_number, o.status, o.subtotal_cents, o.discount_cents,
                   o.shipping_cents, o.total_cents, o.currency, o.created_at,
                   s.status AS shipment_status, s.tracking, s.label_url
            FROM storefront."order" o
            JOIN storefront.carrier_shipment s ON s.order_id = o.id
            WHERE o.order_number = $1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }
}
