//! Catalog reads for checkout.

use async_trait::async_trait;
use souk_core::ProductId;
use sqlx::PgPool;

use super::RepositoryError;
use crate::checkout::store::CatalogReader;
use crate::models::CatalogProduct;

/// `PostgreSQL` catalog.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogReader for PgCatalog {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CatalogProduct>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let products = sqlx::query_as::<_, CatalogProduct>(
            r"
            SELECT id, name, sku, price_cents, category_id, is_active, is_physical,
                   weight_grams, length_cm, width_cm, height_cm
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}
