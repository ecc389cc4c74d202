//! Yandex Geocoder HTTP client.
//!
//! Uses `reqwest` 0.13 with a per-request timeout. The API key travels in the
//! query string, so request URLs are stripped from every logged error.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

use foodcart_core::{Address, Coordinates};

use super::{GeoError, Geocoder, response};
use crate::config::GeocoderConfig;

/// Default Yandex Geocoder endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://geocode-maps.yandex.ru/1.x";

/// Client for the Yandex Geocoder HTTP API.
#[derive(Clone)]
pub struct YandexGeocoder {
    inner: Arc<YandexGeocoderInner>,
}

struct YandexGeocoderInner {
    client: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
}

impl YandexGeocoder {
    /// Create a new geocoder client.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Service`] if the HTTP client cannot be built.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(YandexGeocoderInner {
                client,
                endpoint: config.endpoint.clone(),
                api_key: config.api_key.clone(),
            }),
        })
    }
}

#[async_trait]
impl Geocoder for YandexGeocoder {
    fn name(&self) -> &'static str {
        "yandex"
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn geocode(&self, address: &Address) -> Result<Vec<Coordinates>, GeoError> {
        let response = self
            .inner
            .client
            .get(self.inner.endpoint.clone())
            .query(&[
                ("geocode", address.as_str()),
                ("apikey", self.inner.api_key.expose_secret()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Geocoder returned non-success status"
            );
            return Err(GeoError::Service(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let places = response::parse_places(&response_text).inspect_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse geocoder response"
            );
        })?;

        debug!(places = places.len(), "Geocoder answered");
        Ok(places)
    }
}

impl std::fmt::Debug for YandexGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YandexGeocoder")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
