//! Address geocoding.
//!
//! # Architecture
//!
//! - [`Geocoder`] is the seam to an external geocoding service;
//!   [`YandexGeocoder`] is the production implementation
//! - [`GeoResolver`] answers lookups from the geocode cache while entries
//!   are fresh and falls back to the geocoder otherwise
//! - Failures are returned as [`GeoError`]; callers decide whether a missing
//!   location is fatal
//!
//! # Example
//!
//! ```rust,ignore
//! use foodcart_dispatch::geo::{GeoResolver, YandexGeocoder};
//!
//! let geocoder = YandexGeocoder::new(&config.geocoder)?;
//! let resolver = GeoResolver::new(Arc::new(geocoder), Arc::new(cache));
//!
//! let coordinates = resolver.resolve(&address).await?;
//! ```

mod resolver;
pub mod response;
pub mod yandex;

pub use resolver::{DEFAULT_FRESHNESS_DAYS, GeoResolver};
pub use yandex::YandexGeocoder;

use async_trait::async_trait;
use thiserror::Error;

use foodcart_core::{Address, Coordinates};

/// Errors that can occur when resolving an address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeoError {
    /// The geocoding service could not be reached, timed out, or refused
    /// the request.
    #[error("geocoding service unavailable: {0}")]
    Service(String),

    /// The service answered but found nothing for the address.
    #[error("no location found for address '{address}'")]
    NoMatch {
        /// The address that was looked up.
        address: Address,
    },

    /// The service answered with a payload that could not be interpreted.
    #[error("malformed geocoder response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key
        Self::Service(err.without_url().to_string())
    }
}

/// An external geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short name of the service, used in logs.
    fn name(&self) -> &'static str;

    /// Candidate places for `address`, most relevant first.
    ///
    /// An empty list means the service found nothing.
    async fn geocode(&self, address: &Address) -> Result<Vec<Coordinates>, GeoError>;
}
