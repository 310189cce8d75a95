//! Promotional code administration.
//!
//! # Usage
//!
//! ```bash
//! # 10% off, at most 20.00 off, 100 uses, one per customer
//! souk-cli promo create --code SAVE10 --kind percentage --value 10 \
//!     --max-discount-cents 2000 --usage-limit 100 --user-usage-limit 1
//!
//! # 500 off orders of at least 3000, ending at new year
//! souk-cli promo create --code WINTER --kind fixed --value 500 \
//!     --min-amount-cents 3000 --expires-at 2027-01-01T00:00:00Z
//!
//! # Free shipping on one category
//! souk-cli promo create --code SHIPFREE --kind free-shipping --category 4
//! ```

use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use souk_core::{CategoryId, Cents, ProductId, PromoCode};
use souk_storefront::db::{PgPromotionStore, RepositoryError, create_pool};
use souk_storefront::models::{DiscountKind, Eligibility, NewPromoCode};
use thiserror::Error;

use super::{CommandError, database_url};

/// Errors that can occur while creating a code.
#[derive(Debug, Error)]
pub enum PromoError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid code: {0}")]
    InvalidCode(#[from] souk_core::PromoCodeError),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Promotional code already exists: {0}")]
    CodeExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromoKind {
    Percentage,
    Fixed,
    FreeShipping,
}

#[derive(Debug, Args)]
pub struct PromoArgs {
    /// Code customers type (normalized to upper case)
    #[arg(long)]
    pub code: String,

    #[arg(long, value_enum)]
    pub kind: PromoKind,

    /// Percent for `percentage`, minor units for `fixed`, unused for `free-shipping`
    #[arg(long, allow_negative_numbers = true)]
    pub value: Option<Decimal>,

    /// Minimum cart subtotal in minor units
    #[arg(long)]
    pub min_amount_cents: Option<i64>,

    /// Cap on the discount in minor units
    #[arg(long)]
    pub max_discount_cents: Option<i64>,

    /// Total number of orders that may use the code
    #[arg(long)]
    pub usage_limit: Option<u32>,

    /// Number of orders each signed-in customer may use the code on
    #[arg(long)]
    pub user_usage_limit: Option<u32>,

    /// Start of validity (RFC 3339, defaults to now)
    #[arg(long)]
    pub starts_at: Option<DateTime<Utc>>,

    /// End of validity (RFC 3339); the code stops working at this instant
    #[arg(long)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Restrict to these products (repeatable)
    #[arg(long = "product")]
    pub products: Vec<i32>,

    /// Restrict to these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<i32>,

    /// Never discount these products (repeatable)
    #[arg(long = "exclude")]
    pub excluded: Vec<i32>,
}

fn positive_cents(value: Option<i64>, what: &str) -> Result<Option<Cents>, PromoError> {
    match value {
        Some(v) if v <= 0 => Err(PromoError::InvalidValue(format!(
            "{what} must be positive, got {v}"
        ))),
        other => Ok(other.map(Cents::new)),
    }
}

fn discount_kind(kind: PromoKind, value: Option<Decimal>) -> Result<DiscountKind, PromoError> {
    match (kind, value) {
        (PromoKind::Percentage, Some(percent)) => {
            if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                return Err(PromoError::InvalidValue(format!(
                    "percentage must be in (0, 100], got {percent}"
                )));
            }
            Ok(DiscountKind::Percentage(percent))
        }
        (PromoKind::Fixed, Some(amount)) => {
            if amount.fract() != Decimal::ZERO {
                return Err(PromoError::InvalidValue(format!(
                    "fixed amounts are whole minor units, got {amount}"
                )));
            }
            let cents = i64::try_from(amount)
                .map_err(|_| PromoError::InvalidValue(format!("amount out of range: {amount}")))?;
            positive_cents(Some(cents), "amount")?
                .map(DiscountKind::FixedAmount)
                .ok_or_else(|| PromoError::InvalidValue("amount is required".to_string()))
        }
        (PromoKind::FreeShipping, None) => Ok(DiscountKind::FreeShipping),
        (PromoKind::FreeShipping, Some(_)) => Err(PromoError::InvalidValue(
            "free-shipping codes take no --value".to_string(),
        )),
        (_, None) => Err(PromoError::InvalidValue(
            "--value is required for percentage and fixed codes".to_string(),
        )),
    }
}

/// Turn command-line arguments into a validated code definition.
///
/// # Errors
///
/// Returns `PromoError::InvalidCode` or `PromoError::InvalidValue` for bad input.
pub fn build_new_code(args: &PromoArgs) -> Result<NewPromoCode, PromoError> {
    let code = PromoCode::parse(&args.code)?;
    let kind = discount_kind(args.kind, args.value)?;

    if let (Some(starts), Some(expires)) = (args.starts_at, args.expires_at)
        && expires <= starts
    {
        return Err(PromoError::InvalidValue(
            "expires_at must be after starts_at".to_string(),
        ));
    }
    if args.usage_limit == Some(0) || args.user_usage_limit == Some(0) {
        return Err(PromoError::InvalidValue(
            "usage limits must be at least 1".to_string(),
        ));
    }

    Ok(NewPromoCode {
        code,
        kind,
        minimum_amount: positive_cents(args.min_amount_cents, "minimum amount")?,
        maximum_discount: positive_cents(args.max_discount_cents, "maximum discount")?,
        usage_limit: args.usage_limit,
        user_usage_limit: args.user_usage_limit,
        starts_at: args.starts_at,
        expires_at: args.expires_at,
        eligibility: Eligibility {
            applicable_products: args.products.iter().copied().map(ProductId::new).collect(),
            applicable_categories: args.categories.iter().copied().map(CategoryId::new).collect(),
            excluded_products: args.excluded.iter().copied().map(ProductId::new).collect(),
        },
    })
}

/// Create a promotional code.
///
/// # Returns
///
/// The ID of the created code.
///
/// # Errors
///
/// Returns an error if the input is invalid, the code already exists, or
/// the database write fails.
pub async fn create(args: &PromoArgs) -> Result<i32, PromoError> {
    let new_code = build_new_code(args)?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&database_url()?).await?;

    let created = PgPromotionStore::new(pool)
        .create_promo_code(&new_code)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => PromoError::CodeExists(new_code.code.to_string()),
            other => PromoError::Repository(other),
        })?;

    tracing::info!(
        "Promotional code created successfully! ID: {}, Code: {}, Type: {}",
        created.id,
        created.code,
        created.kind.discount_type()
    );

    Ok(created.id.as_i32())
}
