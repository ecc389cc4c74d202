//! Integration tests for Foodcart dispatch.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory and stub-server tests
//! cargo test -p foodcart-integration-tests
//!
//! # Include PostgreSQL tests (needs a scratch database)
//! DISPATCH_TEST_DATABASE_URL=postgres://localhost/foodcart_test \
//!     cargo test -p foodcart-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_intake` - Order placement, atomicity and assignment
//! - `geocode_cache` - Cache freshness and geocoder call counts
//! - `yandex_geocoder` - HTTP client against a local stub server
//! - `postgres_store` - `PostgreSQL` repositories (ignored by default)
//!
//! This crate holds the shared fakes and fixtures.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use foodcart_core::{Address, Coordinates, Price, ProductId, RestaurantId};
use foodcart_dispatch::db::InMemoryStore;
use foodcart_dispatch::geo::{GeoError, GeoResolver, Geocoder};
use foodcart_dispatch::models::{MenuItem, OrderFields, OrderItemFields, Product, Restaurant};
use foodcart_dispatch::services::OrderIntake;

// =============================================================================
// Fake Geocoder
// =============================================================================

/// Geocoder with scripted answers that records every call.
///
/// Unknown addresses resolve to an empty result.
#[derive(Default)]
pub struct CountingGeocoder {
    answers: Mutex<HashMap<String, Result<Vec<Coordinates>, GeoError>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl CountingGeocoder {
    /// Create a geocoder that knows no addresses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `address` with a single place.
    #[must_use]
    pub fn knowing(self, address: &str, coordinates: Coordinates) -> Self {
        self.answer(address, Ok(vec![coordinates]));
        self
    }

    /// Fail every lookup of `address` with `error`.
    #[must_use]
    pub fn failing(self, address: &str, error: GeoError) -> Self {
        self.answer(address, Err(error));
        self
    }

    /// Replace the answer for `address`.
    pub fn answer(&self, address: &str, answer: Result<Vec<Coordinates>, GeoError>) {
        self.answers
            .lock()
            .unwrap()
            .insert(address.to_owned(), answer);
    }

    /// Total number of calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls for one address.
    #[must_use]
    pub fn calls_for(&self, address: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == address)
            .count()
    }
}

#[async_trait]
impl Geocoder for CountingGeocoder {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn geocode(&self, address: &Address) -> Result<Vec<Coordinates>, GeoError> {
        self.calls.lock().unwrap().push(address.as_str().to_owned());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answers
            .lock()
            .unwrap()
            .get(address.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Customer address used by most tests.
pub const CUSTOMER_ADDRESS: &str = "Moscow, Tverskaya 1";

/// Address of a restaurant stored without coordinates.
pub const UNLOCATED_RESTAURANT_ADDRESS: &str = "Moscow, Arbat 10";

/// Build coordinates from decimal strings.
#[must_use]
pub fn coords(lat: &str, lon: &str) -> Coordinates {
    Coordinates::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
}

/// Build a price from cents.
#[must_use]
pub fn price(cents: i64) -> Price {
    Price::new(Decimal::new(cents, 2)).unwrap()
}

/// Build a product.
#[must_use]
pub fn product(id: i32, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: price(cents),
        category: Some("Burgers".to_string()),
        description: String::new(),
        special_status: false,
    }
}

/// Build a restaurant selling `available` and listing `unavailable` as off the menu.
#[must_use]
pub fn restaurant(
    id: i32,
    coordinates: Option<Coordinates>,
    address: Option<&str>,
    available: &[i32],
    unavailable: &[i32],
) -> Restaurant {
    let menu = available
        .iter()
        .map(|&product| (product, true))
        .chain(unavailable.iter().map(|&product| (product, false)))
        .map(|(product, available)| MenuItem {
            product_id: ProductId::new(product),
            available,
        })
        .collect();

    Restaurant {
        id: RestaurantId::new(id),
        name: format!("Restaurant {id}"),
        address: address.map(|a| Address::parse(a).unwrap()),
        contact_phone: "+7 495 000-00-00".to_string(),
        coordinates,
        menu,
    }
}

/// Build a submission for `address` with `(product, quantity)` lines.
#[must_use]
pub fn order_fields(address: &str, lines: &[(i32, i64)]) -> OrderFields {
    OrderFields {
        firstname: Some("Ivan".to_string()),
        lastname: Some("Petrov".to_string()),
        phonenumber: Some("+7 (999) 123-45-67".to_string()),
        address: Some(address.to_string()),
        products: Some(
            lines
                .iter()
                .map(|&(product, quantity)| OrderItemFields {
                    product: Some(product),
                    quantity: Some(quantity.into()),
                })
                .collect(),
        ),
        payment_method: None,
        comment: None,
    }
}

/// Seed the standard catalog.
///
/// Products 1-4 cost 350.00, 99.50, 120.00 and 45.00.
///
/// | Restaurant | Location                    | Sells      | Off menu |
/// |------------|-----------------------------|------------|----------|
/// | 1          | (55.76, 37.62), ~1.3 km     | 1, 2, 3, 4 |          |
/// | 2          | (55.75, 37.61), on customer | 1, 2       | 3        |
/// | 3          | not stored, has address     | 1, 2, 3    |          |
/// | 4          | Saint Petersburg            | 1, 2, 3, 4 |          |
pub async fn seed_catalog(store: &InMemoryStore) {
    for (id, cents) in [(1, 35_000), (2, 9_950), (3, 12_000), (4, 4_500)] {
        store.insert_product(product(id, cents)).await;
    }
    store
        .insert_restaurant(restaurant(
            1,
            Some(coords("55.76", "37.62")),
            None,
            &[1, 2, 3, 4],
            &[],
        ))
        .await;
    store
        .insert_restaurant(restaurant(
            2,
            Some(coords("55.75", "37.61")),
            None,
            &[1, 2],
            &[3],
        ))
        .await;
    store
        .insert_restaurant(restaurant(
            3,
            None,
            Some(UNLOCATED_RESTAURANT_ADDRESS),
            &[1, 2, 3],
            &[],
        ))
        .await;
    store
        .insert_restaurant(restaurant(
            4,
            Some(coords("59.9386", "30.3141")),
            None,
            &[1, 2, 3, 4],
            &[],
        ))
        .await;
}

/// Wire an intake service over `store` and `geocoder`.
#[must_use]
pub fn intake(store: &InMemoryStore, geocoder: Arc<CountingGeocoder>) -> OrderIntake {
    let shared = Arc::new(store.clone());
    let resolver = Arc::new(GeoResolver::new(geocoder, shared.clone()));
    OrderIntake::new(shared.clone(), shared, resolver)
}

// =============================================================================
// Stub HTTP Server
// =============================================================================

/// Serve `app` on an ephemeral local port.
pub async fn spawn_stub(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A geocoder response body listing `positions` ("lon lat") in order.
#[must_use]
pub fn yandex_body(positions: &[&str]) -> String {
    let members: Vec<serde_json::Value> = positions
        .iter()
        .map(|pos| serde_json::json!({"GeoObject": {"Point": {"pos": pos}}}))
        .collect();
    serde_json::json!({
        "response": {"GeoObjectCollection": {"featureMember": members}}
    })
    .to_string()
}
