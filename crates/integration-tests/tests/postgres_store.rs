//! `PostgreSQL` repository tests.
//!
//! These need a scratch database and are ignored by default:
//!
//! ```bash
//! DISPATCH_TEST_DATABASE_URL=postgres://localhost/foodcart_test \
//!     cargo test -p foodcart-integration-tests --test postgres_store -- --include-ignored
//! ```
//!
//! Every test seeds its own rows, so tests can share one database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeDelta, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use foodcart_core::{
    Address, OrderId, OrderStatus, PaymentMethod, PhoneNumber, ProductId, Quantity, RestaurantId,
};
use foodcart_dispatch::db::{
    CatalogRepository, CatalogStore, GeoCacheRepository, GeoCacheStore, OrderRepository,
    OrderStore, RepositoryError, run_migrations,
};
use foodcart_dispatch::models::{GeoCacheEntry, NewOrder, NewOrderItem};
use foodcart_integration_tests::{coords, price};

async fn pool() -> PgPool {
    let url = std::env::var("DISPATCH_TEST_DATABASE_URL")
        .expect("DISPATCH_TEST_DATABASE_URL must point at a scratch database");
    let pool = PgPool::connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// A string no other test run will produce.
fn unique(prefix: &str) -> String {
    format!(
        "{prefix} {}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn insert_product(pool: &PgPool, cents: i64) -> ProductId {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO foodcart.product (name, price) VALUES ($1, $2) RETURNING id",
    )
    .bind(unique("Product"))
    .bind(Decimal::new(cents, 2))
    .fetch_one(pool)
    .await
    .unwrap();
    ProductId::new(id)
}

async fn insert_restaurant(pool: &PgPool, menu: &[(ProductId, bool)]) -> RestaurantId {
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO foodcart.restaurant (name, address, latitude, longitude)
        VALUES ($1, $2, 55.76, 37.62)
        RETURNING id
        ",
    )
    .bind(unique("Restaurant"))
    .bind(unique("Moscow, Tverskaya"))
    .fetch_one(pool)
    .await
    .unwrap();

    for &(product, available) in menu {
        sqlx::query(
            r"
            INSERT INTO foodcart.restaurant_menu_item (restaurant_id, product_id, availability)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(id)
        .bind(product.as_i32())
        .bind(available)
        .execute(pool)
        .await
        .unwrap();
    }
    RestaurantId::new(id)
}

fn new_order(address: &str, items: &[(ProductId, i64, i64)]) -> NewOrder {
    NewOrder {
        firstname: "Ivan".to_string(),
        lastname: "Petrov".to_string(),
        phonenumber: PhoneNumber::parse("+79991234567").unwrap(),
        address: Address::parse(address).unwrap(),
        payment_method: PaymentMethod::Cash,
        comment: String::new(),
        items: items
            .iter()
            .map(|&(product_id, quantity, cents)| NewOrderItem {
                product_id,
                quantity: Quantity::new(quantity).unwrap(),
                price: price(cents),
            })
            .collect(),
    }
}

async fn count_orders_at(pool: &PgPool, address: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM foodcart.customer_order WHERE address = $1")
        .bind(address)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_order_round_trips_items() {
    let pool = pool().await;
    let first = insert_product(&pool, 35_000).await;
    let second = insert_product(&pool, 9_950).await;
    let repo = OrderRepository::new(pool.clone());
    let address = unique("Moscow, Arbat");

    let created = repo
        .create_order(&new_order(&address, &[(first, 2, 35_000), (second, 1, 9_950)]))
        .await
        .unwrap();

    assert_eq!(created.status, OrderStatus::New);
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.total().amount(), Decimal::new(79_950, 2));

    let loaded = repo.order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_order_rolls_back_on_bad_line() {
    let pool = pool().await;
    let known = insert_product(&pool, 1_000).await;
    let repo = OrderRepository::new(pool.clone());
    let address = unique("Moscow, Arbat");

    let result = repo
        .create_order(&new_order(
            &address,
            &[
                (known, 1, 1_000),
                (known, 1, 1_000),
                (ProductId::new(i32::MAX), 1, 1_000),
                (known, 1, 1_000),
            ],
        ))
        .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    assert_eq!(count_orders_at(&pool, &address).await, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_set_coordinates_and_assign() {
    let pool = pool().await;
    let product = insert_product(&pool, 1_000).await;
    let restaurant = insert_restaurant(&pool, &[(product, true)]).await;
    let repo = OrderRepository::new(pool.clone());
    let created = repo
        .create_order(&new_order(&unique("Moscow, Arbat"), &[(product, 1, 1_000)]))
        .await
        .unwrap();

    repo.set_coordinates(created.id, coords("55.75", "37.61"))
        .await
        .unwrap();
    repo.assign_restaurant(created.id, restaurant).await.unwrap();

    let loaded = repo.order(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.coordinates, Some(coords("55.75", "37.61")));
    assert_eq!(loaded.assigned_restaurant, Some(restaurant));

    assert!(matches!(
        repo.assign_restaurant(OrderId::new(i32::MAX), restaurant).await,
        Err(RepositoryError::NotFound)
    ));
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_restaurant_menu_keeps_availability() {
    let pool = pool().await;
    let on = insert_product(&pool, 1_000).await;
    let off = insert_product(&pool, 2_000).await;
    let id = insert_restaurant(&pool, &[(on, true), (off, false)]).await;
    let repo = CatalogRepository::new(pool);

    let restaurant = repo.restaurant(id).await.unwrap().unwrap();

    assert_eq!(restaurant.coordinates, Some(coords("55.76", "37.62")));
    assert!(restaurant.available_products().contains(&on));
    assert!(!restaurant.available_products().contains(&off));
    assert_eq!(restaurant.menu.len(), 2);

    let priced = repo.products_by_ids(&[on, off]).await.unwrap();
    assert_eq!(priced.len(), 2);

    let available = repo.available_products().await.unwrap();
    assert!(available.iter().any(|p| p.id == on));
    assert!(!available.iter().any(|p| p.id == off));
}

// ============================================================================
// Geocode Cache
// ============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_geocode_cache_upsert_keeps_one_row() {
    let pool = pool().await;
    let repo = GeoCacheRepository::new(pool.clone());
    let address = Address::parse(&unique("Moscow, Tverskaya")).unwrap();
    let now = Utc::now();

    repo.upsert(&GeoCacheEntry {
        address: address.clone(),
        coordinates: coords("1.0", "1.0"),
        updated_at: now - TimeDelta::days(8),
    })
    .await
    .unwrap();

    assert!(
        repo.find_fresh(&address, now - TimeDelta::days(7))
            .await
            .unwrap()
            .is_none()
    );

    repo.upsert(&GeoCacheEntry {
        address: address.clone(),
        coordinates: coords("55.75", "37.61"),
        updated_at: now,
    })
    .await
    .unwrap();

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM foodcart.geocode_cache WHERE address = $1")
            .bind(address.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);

    let fresh = repo
        .find_fresh(&address, now - TimeDelta::days(7))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.coordinates, coords("55.75", "37.61"));
}
