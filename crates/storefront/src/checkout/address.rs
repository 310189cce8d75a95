//! Address resolver: turn a textual destination into the authoritative
//! region and sub-region names stored on the order.
//!
//! The local reference cache is consulted first. When the region is not in
//! the cache (or the cache is unreachable) the remote directory is asked
//! instead. Any failure is an [`CheckoutError::InvalidDestination`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use souk_core::{DeliveryMode, DeskId, RegionId};
use tracing::instrument;

use super::CheckoutError;
use super::request::DeliveryTarget;
use crate::db::RepositoryError;
use crate::directory::DirectoryProvider;
use crate::models::location::names_match;
use crate::models::{Desk, Region, SubRegion};

/// Local destination reference cache.
#[async_trait]
pub trait LocationCache: Send + Sync {
    /// Active region matching `name` case-insensitively.
    async fn active_region_by_name(&self, name: &str) -> Result<Option<Region>, RepositoryError>;

    /// Active sub-region of `region_id` matching `name` case-insensitively.
    async fn active_sub_region_by_name(
        &self,
        region_id: RegionId,
        name: &str,
    ) -> Result<Option<SubRegion>, RepositoryError>;

    /// Alphabetically first active sub-region of a region.
    async fn first_active_sub_region(
        &self,
        region_id: RegionId,
    ) -> Result<Option<SubRegion>, RepositoryError>;

    async fn desk_by_id(&self, id: DeskId) -> Result<Option<Desk>, RepositoryError>;

    async fn active_regions(&self) -> Result<Vec<Region>, RepositoryError>;

    async fn active_sub_regions(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<SubRegion>, RepositoryError>;

    async fn active_desks(&self, region_id: RegionId) -> Result<Vec<Desk>, RepositoryError>;
}

/// Where a destination was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSource {
    LocalCache,
    RemoteDirectory,
}

/// Pickup desk of a desk delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDesk {
    pub id: DeskId,
    /// Unknown when resolved through the remote directory.
    pub name: Option<String>,
}

/// Authoritative destination strings to persist and submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDestination {
    pub region_name: String,
    pub sub_region_name: String,
    pub mode: DeliveryMode,
    pub desk: Option<ResolvedDesk>,
    pub source: DestinationSource,
}

/// Resolves destinations against the cache with a remote fallback.
#[derive(Clone)]
pub struct AddressResolver {
    cache: Arc<dyn LocationCache>,
    directory: Option<Arc<dyn DirectoryProvider>>,
}

impl AddressResolver {
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocationCache>,
        directory: Option<Arc<dyn DirectoryProvider>>,
    ) -> Self {
        Self { cache, directory }
    }

    /// Resolve a delivery target.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidDestination`] when neither the cache
    /// nor the remote directory can resolve the target.
    #[instrument(skip(self), fields(region = %target.region()))]
    pub async fn resolve(
        &self,
        target: &DeliveryTarget,
    ) -> Result<ResolvedDestination, CheckoutError> {
        let region = match self.cache.active_region_by_name(target.region()).await {
            Ok(region) => region,
            Err(e) => {
                tracing::warn!(error = %e, "Location cache lookup failed, trying remote directory");
                None
            }
        };

        match region {
            Some(region) => self.resolve_local(&region, target).await,
            None => self.resolve_remote(target).await,
        }
    }

    async fn resolve_local(
        &self,
        region: &Region,
        target: &DeliveryTarget,
    ) -> Result<ResolvedDestination, CheckoutError> {
        match target {
            DeliveryTarget::Home { sub_region, .. } => {
                let found = self
                    .cache
                    .active_sub_region_by_name(region.id, sub_region)
                    .await
                    .map_err(lookup_failed)?
                    .ok_or_else(|| {
                        CheckoutError::InvalidDestination(format!(
                            "unknown sub-region '{}' in {}",
                            sub_region.trim(),
                            region.name
                        ))
                    })?;

                Ok(ResolvedDestination {
                    region_name: region.name.clone(),
                    sub_region_name: found.name,
                    mode: DeliveryMode::Home,
                    desk: None,
                    source: DestinationSource::LocalCache,
                })
            }
            DeliveryTarget::Desk { desk_id, .. } => {
                let desk = self
                    .cache
                    .desk_by_id(*desk_id)
                    .await
                    .map_err(lookup_failed)?
                    .filter(|d| d.is_active && d.region_id == region.id)
                    .ok_or_else(|| {
                        CheckoutError::InvalidDestination(format!(
                            "desk {desk_id} is not available in {}",
                            region.name
                        ))
                    })?;

                let sub_region_name = self.main_sub_region(region).await;

                Ok(ResolvedDestination {
                    region_name: region.name.clone(),
                    sub_region_name,
                    mode: DeliveryMode::Desk,
                    desk: Some(ResolvedDesk {
                        id: desk.id,
                        name: Some(desk.name),
                    }),
                    source: DestinationSource::LocalCache,
                })
            }
        }
    }

    /// Sub-region recorded for a desk delivery.
    ///
    /// Tries a sub-region named like the region, then the alphabetically
    /// first one, then the region name itself. Never fails.
    async fn main_sub_region(&self, region: &Region) -> String {
        match self
            .cache
            .active_sub_region_by_name(region.id, &region.name)
            .await
        {
            Ok(Some(sub)) => return sub.name,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Sub-region lookup failed"),
        }

        match self.cache.first_active_sub_region(region.id).await {
            Ok(Some(sub)) => return sub.name,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Sub-region lookup failed"),
        }

        region.name.clone()
    }

    async fn resolve_remote(
        &self,
        target: &DeliveryTarget,
    ) -> Result<ResolvedDestination, CheckoutError> {
        let Some(directory) = &self.directory else {
            return Err(CheckoutError::InvalidDestination(format!(
                "unknown region '{}'",
                target.region().trim()
            )));
        };

        let regions = directory.regions().await.map_err(|e| {
            tracing::warn!(error = %e, "Remote directory region lookup failed");
            CheckoutError::InvalidDestination("destination directory is unavailable".to_string())
        })?;
        let region = regions
            .into_iter()
            .find(|r| names_match(&r.name, target.region()))
            .ok_or_else(|| {
                CheckoutError::InvalidDestination(format!(
                    "unknown region '{}'",
                    target.region().trim()
                ))
            })?;

        let destination = match target {
            DeliveryTarget::Home { sub_region, .. } => {
                let subs = directory.sub_regions(&region.id).await.map_err(|e| {
                    tracing::warn!(error = %e, "Remote directory sub-region lookup failed");
                    CheckoutError::InvalidDestination(
                        "destination directory is unavailable".to_string(),
                    )
                })?;
                let sub = subs
                    .into_iter()
                    .find(|s| names_match(&s.name, sub_region))
                    .ok_or_else(|| {
                        CheckoutError::InvalidDestination(format!(
                            "unknown sub-region '{}' in {}",
                            sub_region.trim(),
                            region.name
                        ))
                    })?;
                ResolvedDestination {
                    region_name: region.name,
                    sub_region_name: sub.name,
                    mode: DeliveryMode::Home,
                    desk: None,
                    source: DestinationSource::RemoteDirectory,
                }
            }
            DeliveryTarget::Desk { desk_id, .. } => ResolvedDestination {
                sub_region_name: region.name.clone(),
                region_name: region.name,
                mode: DeliveryMode::Desk,
                desk: Some(ResolvedDesk {
                    id: *desk_id,
                    name: None,
                }),
                source: DestinationSource::RemoteDirectory,
            },
        };

        tracing::info!(
            region = %destination.region_name,
            "Destination resolved through remote directory"
        );
        Ok(destination)
    }
}

fn lookup_failed(e: RepositoryError) -> CheckoutError {
    tracing::warn!(error = %e, "Location cache lookup failed");
    CheckoutError::InvalidDestination("destination could not be verified".to_string())
}
