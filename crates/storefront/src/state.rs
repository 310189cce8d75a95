//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::carrier::{CarrierError, CarrierGateway, DisabledCarrier, HttpCarrierClient};
use crate::checkout::{
    AddressResolver, CheckoutCollaborators, CheckoutService, CheckoutSettings, DiscountEngine,
    LocationCache,
};
use crate::config::StorefrontConfig;
use crate::db::{PgCatalog, PgLocationStore, PgOrderStore, PgPromotionStore};
use crate::directory::{DirectoryError, DirectoryProvider, HttpDirectoryClient};
use crate::services::{LogNotifier, Notifier, NotifyError, WebhookNotifier};

/// Error wiring the outbound clients at start-up.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("carrier client: {0}")]
    Carrier(#[from] CarrierError),
    #[error("directory client: {0}")]
    Directory(#[from] DirectoryError),
    #[error("notification webhook: {0}")]
    Notify(#[from] NotifyError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the database pool, the checkout service and the location cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    checkout: CheckoutService,
    locations: Arc<dyn LocationCache>,
}

impl AppState {
    /// Assemble state from already built parts.
    #[must_use]
    pub fn new(pool: PgPool, checkout: CheckoutService, locations: Arc<dyn LocationCache>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                checkout,
                locations,
            }),
        }
    }

    /// Build the production state: `PostgreSQL` repositories plus the HTTP
    /// clients enabled by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let locations = Arc::new(PgLocationStore::new(pool.clone()));

        let directory: Option<Arc<dyn DirectoryProvider>> = match &config.directory {
            Some(directory) => Some(Arc::new(HttpDirectoryClient::new(
                directory.url.clone(),
                directory.token.clone(),
            )?)),
            None => {
                tracing::info!("No remote directory configured, using local cache only");
                None
            }
        };

        let carrier: Arc<dyn CarrierGateway> = match &config.carrier.api {
            Some(api) => Arc::new(HttpCarrierClient::new(
                api.url.clone(),
                api.api_id.clone(),
                api.api_token.clone(),
            )?),
            None => {
                tracing::info!("Carrier submission disabled, orders queue for manual review");
                Arc::new(DisabledCarrier)
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.admin_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
            None => Arc::new(LogNotifier),
        };

        let deps = CheckoutCollaborators {
            catalog: Arc::new(PgCatalog::new(pool.clone())),
            resolver: AddressResolver::new(locations.clone(), directory),
            discounts: DiscountEngine::new(Arc::new(PgPromotionStore::new(pool.clone()))),
            rates: locations.clone(),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            carrier,
            notifier,
        };

        let settings = CheckoutSettings {
            currency: config.currency,
            order_prefix: config.order_prefix.clone(),
            from_region: config.carrier.from_region.clone(),
        };

        Ok(Self::new(
            pool,
            CheckoutService::new(deps, settings),
            locations,
        ))
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the destination reference cache.
    #[must_use]
    pub fn locations(&self) -> &dyn LocationCache {
        self.inner.locations.as_ref()
    }
}
