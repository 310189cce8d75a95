//! Promotional code repository.
//!
//! Usage counters are never touched here; the order repository applies them
//! inside the order transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use souk_core::{
    CategoryId, Cents, DiscountType, ProductId, PromoCode, PromoCodeId, UserId,
};
use sqlx::PgPool;

use super::{RepositoryError, map_unique_violation};
use crate::checkout::store::PromotionStore;
use crate::models::{DiscountKind, Eligibility, NewPromoCode, PromotionalCode};

/// Raw `promo_code` row.
#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    id: PromoCodeId,
    code: String,
    discount_type: DiscountType,
    percent: Option<Decimal>,
    amount_cents: Option<Cents>,
    minimum_amount_cents: Option<Cents>,
    maximum_discount_cents: Option<Cents>,
    usage_limit: Option<i32>,
    used_count: i32,
    user_usage_limit: Option<i32>,
    is_active: bool,
    starts_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    applicable_products: Vec<i32>,
    applicable_categories: Vec<i32>,
    excluded_products: Vec<i32>,
}

const PROMO_CODE_COLUMNS: &str = "id, code, discount_type, percent, amount_cents, \
     minimum_amount_cents, maximum_discount_cents, usage_limit, used_count, user_usage_limit, \
     is_active, starts_at, expires_at, applicable_products, applicable_categories, \
     excluded_products";

impl TryFrom<PromoCodeRow> for PromotionalCode {
    type Error = RepositoryError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        let code = PromoCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid promo code in database: {e}"))
        })?;

        let kind = match (row.discount_type, row.percent, row.amount_cents) {
            (DiscountType::Percentage, Some(percent), _) => DiscountKind::Percentage(percent),
            (DiscountType::FixedAmount, _, Some(amount)) => DiscountKind::FixedAmount(amount),
            (DiscountType::FreeShipping, _, _) => DiscountKind::FreeShipping,
            (kind, _, _) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "promo code {} has no value for type {kind}",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            code,
            kind,
            minimum_amount: row.minimum_amount_cents,
            maximum_discount: row.maximum_discount_cents,
            usage_limit: row.usage_limit.map(non_negative).transpose()?,
            used_count: non_negative(row.used_count)?,
            user_usage_limit: row.user_usage_limit.map(non_negative).transpose()?,
            is_active: row.is_active,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            eligibility: Eligibility {
                applicable_products: row
                    .applicable_products
                    .into_iter()
                    .map(ProductId::new)
                    .collect(),
                applicable_categories: row
                    .applicable_categories
                    .into_iter()
                    .map(CategoryId::new)
                    .collect(),
                excluded_products: row.excluded_products.into_iter().map(ProductId::new).collect(),
            },
        })
    }
}

fn non_negative(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative counter: {value}")))
}

fn to_db_count(value: Option<u32>) -> Result<Option<i32>, RepositoryError> {
    value
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| RepositoryError::Conflict(format!("limit {v} is too large")))
        })
        .transpose()
}

/// `PostgreSQL` promotional code store.
#[derive(Debug, Clone)]
pub struct PgPromotionStore {
    pool: PgPool,
}

impl PgPromotionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a promotional code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_promo_code(
        &self,
        new: &NewPromoCode,
    ) -> Result<PromotionalCode, RepositoryError> {
        let (percent, amount) = match new.kind {
            DiscountKind::Percentage(p) => (Some(p), None),
            DiscountKind::FixedAmount(a) => (None, Some(a)),
            DiscountKind::FreeShipping => (None, None),
        };
        let ids = |v: &[ProductId]| v.iter().map(ProductId::as_i32).collect::<Vec<_>>();
        let categories: Vec<i32> = new
            .eligibility
            .applicable_categories
            .iter()
            .map(CategoryId::as_i32)
            .collect();

        let sql = format!(
            r"
            INSERT INTO storefront.promo_code (
                code, discount_type, percent, amount_cents, minimum_amount_cents,
                maximum_discount_cents, usage_limit, user_usage_limit, starts_at, expires_at,
                applicable_products, applicable_categories, excluded_products
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()), $10, $11, $12, $13)
            RETURNING {PROMO_CODE_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(new.code.as_str())
            .bind(new.kind.discount_type())
            .bind(percent)
            .bind(amount)
            .bind(new.minimum_amount)
            .bind(new.maximum_discount)
            .bind(to_db_count(new.usage_limit)?)
            .bind(to_db_count(new.user_usage_limit)?)
            .bind(new.starts_at)
            .bind(new.expires_at)
            .bind(ids(&new.eligibility.applicable_products))
            .bind(categories)
            .bind(ids(&new.eligibility.excluded_products))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "promo code"))?;

        row.try_into()
    }
}

#[async_trait]
impl PromotionStore for PgPromotionStore {
    async fn code_by_name(
        &self,
        code: &PromoCode,
    ) -> Result<Option<PromotionalCode>, RepositoryError> {
        let sql = format!(
            "SELECT {PROMO_CODE_COLUMNS} FROM storefront.promo_code WHERE code = $1"
        );
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(PromotionalCode::try_from).transpose()
    }

    async fn user_usage_count(
        &self,
        code_id: PromoCodeId,
        user_id: UserId,
    ) -> Result<u32, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM storefront.promo_code_usage
            WHERE promo_code_id = $1 AND user_id = $2
            ",
        )
        .bind(code_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("usage count {count}")))
    }
}
