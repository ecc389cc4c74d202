//! Storage for orders, the restaurant catalog and the geocode cache.
//!
//! # Database: `foodcart`
//!
//! ## Tables
//!
//! - `product_category`, `product` - Catalog products
//! - `restaurant`, `restaurant_menu_item` - Restaurants and what they sell
//! - `customer_order`, `order_item` - Orders with price snapshots
//! - `geocode_cache` - Address resolutions keyed by normalized address
//!
//! # Backends
//!
//! Each concern has a trait ([`GeoCacheStore`], [`CatalogStore`],
//! [`OrderStore`]) implemented by a `PostgreSQL` repository and by
//! [`InMemoryStore`] for tests and local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/dispatch/migrations/` and run via:
//! ```bash
//! cargo run -p foodcart-cli -- migrate
//! ```

pub mod catalog;
pub mod geocache;
pub mod memory;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use foodcart_core::{Address, Coordinates, OrderId, ProductId, RestaurantId};

use crate::models::{GeoCacheEntry, NewOrder, Order, Product, Restaurant};

pub use catalog::CatalogRepository;
pub use geocache::GeoCacheRepository;
pub use memory::InMemoryStore;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unknown product in an order line).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Address resolutions keyed by normalized address.
#[async_trait]
pub trait GeoCacheStore: Send + Sync {
    /// Look up the entry for `address` regardless of age.
    async fn find(&self, address: &Address) -> Result<Option<GeoCacheEntry>, RepositoryError>;

    /// Look up the entry for `address` if it was updated at or after `not_before`.
    async fn find_fresh(
        &self,
        address: &Address,
        not_before: DateTime<Utc>,
    ) -> Result<Option<GeoCacheEntry>, RepositoryError>;

    /// Insert the entry, or replace coordinates and timestamp of an existing one.
    async fn upsert(&self, entry: &GeoCacheEntry) -> Result<(), RepositoryError>;
}

/// Read access to products and restaurants.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products with the given IDs. Unknown IDs are skipped.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Products available in at least one restaurant.
    async fn available_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// All restaurants with their menus, ordered by ID.
    async fn restaurants_with_menu(&self) -> Result<Vec<Restaurant>, RepositoryError>;

    /// A single restaurant with its menu.
    async fn restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order and all of its lines atomically.
    ///
    /// Either the order and every line become visible together, or nothing
    /// is stored.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Load an order with its lines.
    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Record the delivery coordinates of an order.
    async fn set_coordinates(
        &self,
        id: OrderId,
        coordinates: Coordinates,
    ) -> Result<(), RepositoryError>;

    /// Record the restaurant chosen to fulfill an order.
    async fn assign_restaurant(
        &self,
        id: OrderId,
        restaurant: RestaurantId,
    ) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations from `crates/dispatch/migrations/`.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Build coordinates from two nullable `NUMERIC` columns.
pub(crate) fn coordinates_from_columns(
    latitude: Option<rust_decimal::Decimal>,
    longitude: Option<rust_decimal::Decimal>,
) -> Result<Option<Coordinates>, RepositoryError> {
    Coordinates::from_parts(latitude, longitude)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}")))
}
