//! Cached address resolution.
//!
//! Lookups are answered from the geocode cache while an entry is younger
//! than the freshness window. Otherwise the geocoder is asked, and its most
//! relevant place is written back to the cache.
//!
//! The cache is an optimization only: a failed cache read is treated as a
//! miss and a failed cache write is logged, neither fails the lookup.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use moka::future::Cache;
use tracing::{Span, debug, info, info_span, instrument, warn};

use foodcart_core::{Address, Coordinates};

use super::{GeoError, Geocoder};
use crate::db::GeoCacheStore;
use crate::models::GeoCacheEntry;

/// Default number of days a cached resolution is trusted.
pub const DEFAULT_FRESHNESS_DAYS: i64 = 7;

/// Resolves addresses to coordinates through the geocode cache.
pub struct GeoResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Arc<dyn GeoCacheStore>,
    freshness: TimeDelta,
    /// Lookups currently in progress, when request coalescing is enabled.
    in_flight: Option<Cache<String, Coordinates>>,
    /// Parent span for every lookup.
    span: Span,
}

impl GeoResolver {
    /// Create a resolver with the default freshness window and no request
    /// coalescing.
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: Arc<dyn GeoCacheStore>) -> Self {
        let span = info_span!("geo_resolver", geocoder = geocoder.name());
        Self {
            geocoder,
            cache,
            freshness: TimeDelta::days(DEFAULT_FRESHNESS_DAYS),
            in_flight: None,
            span,
        }
    }

    /// Trust cached resolutions for `window` instead of the default.
    #[must_use]
    pub const fn with_freshness_window(mut self, window: TimeDelta) -> Self {
        self.freshness = window;
        self
    }

    /// Share one geocoder request between concurrent lookups of the same
    /// address.
    #[must_use]
    pub fn with_request_coalescing(mut self) -> Self {
        self.in_flight = Some(Cache::builder().max_capacity(10_000).build());
        self
    }

    /// Freshness window in use.
    #[must_use]
    pub const fn freshness_window(&self) -> TimeDelta {
        self.freshness
    }

    /// Resolve `address` to coordinates.
    ///
    /// # Errors
    ///
    /// - [`GeoError::Service`] if the geocoder is unreachable or times out
    /// - [`GeoError::NoMatch`] if the geocoder finds nothing
    /// - [`GeoError::MalformedResponse`] if the geocoder answer is unreadable
    #[instrument(parent = &self.span, skip(self), fields(address = %address))]
    pub async fn resolve(&self, address: &Address) -> Result<Coordinates, GeoError> {
        let result = match &self.in_flight {
            Some(in_flight) => {
                let key = address.as_str().to_owned();
                let shared = in_flight
                    .try_get_with(key.clone(), self.lookup(address))
                    .await;
                // Only deduplicate lookups that overlap; later calls consult
                // the geocode cache again.
                in_flight.invalidate(&key).await;
                shared.map_err(Arc::unwrap_or_clone)
            }
            None => self.lookup(address).await,
        };

        match &result {
            Ok(_) => {}
            Err(e @ GeoError::MalformedResponse(_)) => {
                tracing::error!(error = %e, "Address resolution failed");
            }
            Err(e @ GeoError::Service(_)) => warn!(error = %e, "Address resolution failed"),
            Err(e @ GeoError::NoMatch { .. }) => info!(error = %e, "Address not found"),
        }
        result
    }

    async fn lookup(&self, address: &Address) -> Result<Coordinates, GeoError> {
        let now = Utc::now();

        match self.cache.find_fresh(address, now - self.freshness).await {
            Ok(Some(entry)) => {
                debug!("Geocode cache hit");
                return Ok(entry.coordinates);
            }
            Ok(None) => debug!("Geocode cache miss"),
            Err(e) => warn!(error = %e, "Geocode cache read failed, asking geocoder"),
        }

        let coordinates = self
            .geocoder
            .geocode(address)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::NoMatch {
                address: address.clone(),
            })?;

        let entry = GeoCacheEntry {
            address: address.clone(),
            coordinates,
            updated_at: now,
        };
        if let Err(e) = self.cache.upsert(&entry).await {
            warn!(error = %e, "Geocode cache write failed");
        }

        Ok(coordinates)
    }
}

impl std::fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoResolver")
            .field("geocoder", &self.geocoder.name())
            .field("freshness", &self.freshness)
            .field("coalesce_requests", &self.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{InMemoryStore, RepositoryError};

    /// Geocoder that answers with a fixed result and counts calls.
    struct FakeGeocoder {
        answer: Result<Vec<Coordinates>, GeoError>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeGeocoder {
        fn answering(answer: Result<Vec<Coordinates>, GeoError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(answer: Vec<Coordinates>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn geocode(&self, _address: &Address) -> Result<Vec<Coordinates>, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone()
        }
    }

    /// Cache store whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl GeoCacheStore for BrokenCache {
        async fn find(&self, _: &Address) -> Result<Option<GeoCacheEntry>, RepositoryError> {
            Err(RepositoryError::DataCorruption("broken".to_string()))
        }

        async fn find_fresh(
            &self,
            _: &Address,
            _: DateTime<Utc>,
        ) -> Result<Option<GeoCacheEntry>, RepositoryError> {
            Err(RepositoryError::DataCorruption("broken".to_string()))
        }

        async fn upsert(&self, _: &GeoCacheEntry) -> Result<(), RepositoryError> {
            Err(RepositoryError::DataCorruption("broken".to_string()))
        }
    }

    fn coords(lat: &str, lon: &str) -> Coordinates {
        Coordinates::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
    }

    fn address() -> Address {
        Address::parse("Moscow, Tverskaya 1").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_miss_then_hit() {
        let geocoder = FakeGeocoder::answering(Ok(vec![coords("55.7558", "37.6176")]));
        let cache = Arc::new(InMemoryStore::new());
        let resolver = GeoResolver::new(geocoder.clone(), cache.clone());

        let first = resolver.resolve(&address()).await.unwrap();
        let second = resolver.resolve(&address()).await.unwrap();

        assert_eq!(first, coords("55.7558", "37.6176"));
        assert_eq!(first, second);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(
            cache.find(&address()).await.unwrap().map(|e| e.coordinates),
            Some(first)
        );
    }

    #[tokio::test]
    async fn test_resolve_takes_first_place() {
        let geocoder = FakeGeocoder::answering(Ok(vec![
            coords("55.7558", "37.6176"),
            coords("59.9386", "30.3141"),
        ]));
        let resolver = GeoResolver::new(geocoder, Arc::new(InMemoryStore::new()));

        assert_eq!(
            resolver.resolve(&address()).await.unwrap(),
            coords("55.7558", "37.6176")
        );
    }

    #[tokio::test]
    async fn test_resolve_refreshes_stale_entry() {
        let geocoder = FakeGeocoder::answering(Ok(vec![coords("55.7558", "37.6176")]));
        let cache = Arc::new(InMemoryStore::new());
        cache
            .upsert(&GeoCacheEntry {
                address: address(),
                coordinates: coords("1", "1"),
                updated_at: Utc::now() - TimeDelta::days(8),
            })
            .await
            .unwrap();
        let resolver = GeoResolver::new(geocoder.clone(), cache.clone());

        let resolved = resolver.resolve(&address()).await.unwrap();

        assert_eq!(resolved, coords("55.7558", "37.6176"));
        assert_eq!(geocoder.calls(), 1);
        let entry = cache.find(&address()).await.unwrap().unwrap();
        assert_eq!(entry.coordinates, resolved);
        assert!(entry.updated_at > Utc::now() - TimeDelta::minutes(1));
    }

    #[tokio::test]
    async fn test_resolve_uses_fresh_entry_without_geocoder() {
        let geocoder = FakeGeocoder::answering(Err(GeoError::Service("down".to_string())));
        let cache = Arc::new(InMemoryStore::new());
        cache
            .upsert(&GeoCacheEntry {
                address: address(),
                coordinates: coords("55.7558", "37.6176"),
                updated_at: Utc::now() - TimeDelta::days(6),
            })
            .await
            .unwrap();
        let resolver = GeoResolver::new(geocoder.clone(), cache);

        assert_eq!(
            resolver.resolve(&address()).await.unwrap(),
            coords("55.7558", "37.6176")
        );
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_freshness_window() {
        let geocoder = FakeGeocoder::answering(Ok(vec![coords("55.7558", "37.6176")]));
        let cache = Arc::new(InMemoryStore::new());
        cache
            .upsert(&GeoCacheEntry {
                address: address(),
                coordinates: coords("1", "1"),
                updated_at: Utc::now() - TimeDelta::days(2),
            })
            .await
            .unwrap();
        let resolver = GeoResolver::new(geocoder.clone(), cache)
            .with_freshness_window(TimeDelta::days(1));

        assert_eq!(
            resolver.resolve(&address()).await.unwrap(),
            coords("55.7558", "37.6176")
        );
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_match_leaves_cache_untouched() {
        let geocoder = FakeGeocoder::answering(Ok(Vec::new()));
        let cache = Arc::new(InMemoryStore::new());
        let resolver = GeoResolver::new(geocoder, cache.clone());

        let result = resolver.resolve(&address()).await;

        assert_eq!(result, Err(GeoError::NoMatch { address: address() }));
        assert!(cache.find(&address()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let geocoder = FakeGeocoder::answering(Err(GeoError::Service("timeout".to_string())));
        let cache = Arc::new(InMemoryStore::new());
        let resolver = GeoResolver::new(geocoder, cache.clone());

        assert!(matches!(
            resolver.resolve(&address()).await,
            Err(GeoError::Service(_))
        ));
        assert!(cache.find(&address()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broken_cache_falls_back_to_geocoder() {
        let geocoder = FakeGeocoder::answering(Ok(vec![coords("55.7558", "37.6176")]));
        let resolver = GeoResolver::new(geocoder.clone(), Arc::new(BrokenCache));

        assert_eq!(
            resolver.resolve(&address()).await.unwrap(),
            coords("55.7558", "37.6176")
        );
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_coalescing_shares_concurrent_lookups() {
        let geocoder = FakeGeocoder::slow(
            vec![coords("55.7558", "37.6176")],
            Duration::from_millis(50),
        );
        let resolver = GeoResolver::new(geocoder.clone(), Arc::new(InMemoryStore::new()))
            .with_request_coalescing();

        let address = address();
        let (a, b) = tokio::join!(resolver.resolve(&address), resolver.resolve(&address));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_coalescing_shares_errors() {
        let geocoder = FakeGeocoder::answering(Err(GeoError::Service("down".to_string())));
        let resolver = GeoResolver::new(geocoder.clone(), Arc::new(BrokenCache))
            .with_request_coalescing();

        assert!(matches!(
            resolver.resolve(&address()).await,
            Err(GeoError::Service(_))
        ));
        // A failed lookup is not remembered.
        assert!(resolver.resolve(&address()).await.is_err());
        assert_eq!(geocoder.calls(), 2);
    }
}
