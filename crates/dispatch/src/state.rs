//! Application state shared by dispatch binaries.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DispatchConfig;
use crate::db::{CatalogRepository, GeoCacheRepository, OrderRepository};
use crate::geo::{GeoError, GeoResolver, YandexGeocoder};
use crate::services::OrderIntake;

/// Application state wiring storage, geocoding and intake together.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DispatchConfig,
    pool: PgPool,
    resolver: Arc<GeoResolver>,
    intake: OrderIntake,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Dispatch configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the geocoder HTTP client cannot be built.
    pub fn new(config: DispatchConfig, pool: PgPool) -> Result<Self, GeoError> {
        let geocoder = YandexGeocoder::new(&config.geocoder)?;

        let mut resolver = GeoResolver::new(
            Arc::new(geocoder),
            Arc::new(GeoCacheRepository::new(pool.clone())),
        )
        .with_freshness_window(config.geocache_freshness);
        if config.geocoder.coalesce_requests {
            resolver = resolver.with_request_coalescing();
        }
        let resolver = Arc::new(resolver);

        let intake = OrderIntake::new(
            Arc::new(OrderRepository::new(pool.clone())),
            Arc::new(CatalogRepository::new(pool.clone())),
            Arc::clone(&resolver),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                resolver,
                intake,
            }),
        })
    }

    /// Get a reference to the dispatch configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the address resolver.
    #[must_use]
    pub fn resolver(&self) -> &GeoResolver {
        &self.inner.resolver
    }

    /// Get a reference to the order intake service.
    #[must_use]
    pub fn intake(&self) -> &OrderIntake {
        &self.inner.intake
    }
}
