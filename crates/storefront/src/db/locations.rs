//! Destination reference cache and shipping rates.

use async_trait::async_trait;
use souk_core::{DeskId, RegionId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::checkout::address::LocationCache;
use crate::checkout::store::ShippingRates;
use crate::models::{Desk, LocationSeed, Region, SeedCounts, ShippingRate, SubRegion};

/// `PostgreSQL` location store.
#[derive(Debug, Clone)]
pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert regions, sub-regions, desks and rates in one transaction.
    ///
    /// Rows are keyed by id, so running the same seed twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is
    /// written in that case.
    pub async fn seed_locations(&self, seed: &LocationSeed) -> Result<SeedCounts, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = SeedCounts::default();

        for region in &seed.regions {
            sqlx::query(
                r"
                INSERT INTO storefront.region (id, name, code, is_active)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, code = EXCLUDED.code, is_active = EXCLUDED.is_active
                ",
            )
            .bind(region.id)
            .bind(region.name.trim())
            .bind(region.code.as_deref())
            .bind(region.is_active)
            .execute(&mut *tx)
            .await?;
            counts.regions += 1;

            for sub in &region.sub_regions {
                sqlx::query(
                    r"
                    INSERT INTO storefront.sub_region (id, region_id, name, is_active)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO UPDATE
                    SET region_id = EXCLUDED.region_id, name = EXCLUDED.name,
                        is_active = EXCLUDED.is_active
                    ",
                )
                .bind(sub.id)
                .bind(region.id)
                .bind(sub.name.trim())
                .bind(sub.is_active)
                .execute(&mut *tx)
                .await?;
                counts.sub_regions += 1;
            }

            for desk in &region.desks {
                sqlx::query(
                    r"
                    INSERT INTO storefront.carrier_desk (id, region_id, name, address, is_active)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (id) DO UPDATE
                    SET region_id = EXCLUDED.region_id, name = EXCLUDED.name,
                        address = EXCLUDED.address, is_active = EXCLUDED.is_active
                    ",
                )
                .bind(desk.id)
                .bind(region.id)
                .bind(desk.name.trim())
                .bind(desk.address.as_deref())
                .bind(desk.is_active)
                .execute(&mut *tx)
                .await?;
                counts.desks += 1;
            }

            if let Some(rate) = &region.rate {
                sqlx::query(
                    r"
                    INSERT INTO storefront.shipping_rate
                        (region_id, home_cents, desk_cents, included_kg, extra_kg_cents)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (region_id) DO UPDATE
                    SET home_cents = EXCLUDED.home_cents, desk_cents = EXCLUDED.desk_cents,
                        included_kg = EXCLUDED.included_kg,
                        extra_kg_cents = EXCLUDED.extra_kg_cents
                    ",
                )
                .bind(region.id)
                .bind(rate.home_cents)
                .bind(rate.desk_cents)
                .bind(rate.included_kg)
                .bind(rate.extra_kg_cents)
                .execute(&mut *tx)
                .await?;
                counts.rates += 1;
            }
        }

        tx.commit().await?;
        Ok(counts)
    }
}

#[async_trait]
impl LocationCache for PgLocationStore {
    async fn active_region_by_name(&self, name: &str) -> Result<Option<Region>, RepositoryError> {
        let region = sqlx::query_as::<_, Region>(
            r"
            SELECT id, name, code, is_active
            FROM storefront.region
            WHERE is_active AND LOWER(name) = LOWER(TRIM($1))
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(region)
    }

    async fn active_sub_region_by_name(
        &self,
        region_id: RegionId,
        name: &str,
    ) -> Result<Option<SubRegion>, RepositoryError> {
        let sub = sqlx::query_as::<_, SubRegion>(
            r"
            SELECT id, region_id, name, is_active
            FROM storefront.sub_region
            WHERE region_id = $1 AND is_active AND LOWER(name) = LOWER(TRIM($2))
            ",
        )
        .bind(region_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn first_active_sub_region(
        &self,
        region_id: RegionId,
    ) -> Result<Option<SubRegion>, RepositoryError> {
        let sub = sqlx::query_as::<_, SubRegion>(
            r"
            SELECT id, region_id, name, is_active
            FROM storefront.sub_region
            WHERE region_id = $1 AND is_active
            ORDER BY LOWER(name), id
            LIMIT 1
            ",
        )
        .bind(region_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn desk_by_id(&self, id: DeskId) -> Result<Option<Desk>, RepositoryError> {
        let desk = sqlx::query_as::<_, Desk>(
            r"
            SELECT id, region_id, name, address, is_active
            FROM storefront.carrier_desk
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(desk)
    }

    async fn active_regions(&self) -> Result<Vec<Region>, RepositoryError> {
        let regions = sqlx::query_as::<_, Region>(
            r"
            SELECT id, name, code, is_active
            FROM storefront.region
            WHERE is_active
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(regions)
    }

    async fn active_sub_regions(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<SubRegion>, RepositoryError> {
        let subs = sqlx::query_as::<_, SubRegion>(
            r"
            SELECT id, region_id, name, is_active
            FROM storefront.sub_region
            WHERE region_id = $1 AND is_active
            ORDER BY name
            ",
        )
        .bind(region_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn active_desks(&self, region_id: RegionId) -> Result<Vec<Desk>, RepositoryError> {
        let desks = sqlx::query_as::<_, Desk>(
            r"
            SELECT id, region_id, name, address, is_active
            FROM storefront.carrier_desk
            WHERE region_id = $1 AND is_active
            ORDER BY name
            ",
        )
        .bind(region_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(desks)
    }
}

#[async_trait]
impl ShippingRates for PgLocationStore {
    async fn rate_for_region(
        &self,
        region_name: &str,
    ) -> Result<Option<ShippingRate>, RepositoryError> {
        let rate = sqlx::query_as::<_, ShippingRate>(
            r"
            SELECT r.region_id, r.home_cents, r.desk_cents, r.included_kg, r.extra_kg_cents
            FROM storefront.shipping_rate r
            JOIN storefront.region g ON g.id = r.region_id
            WHERE LOWER(g.name) = LOWER(TRIM($1))
            ",
        )
        .bind(region_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }
}
