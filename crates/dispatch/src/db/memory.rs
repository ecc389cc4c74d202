//! In-memory storage backend.
//!
//! Implements every storage trait over `tokio` locks so the dispatch flow can
//! run without a database. Clones share state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use foodcart_core::{Address, Coordinates, OrderId, OrderItemId, ProductId, RestaurantId};

use super::{CatalogStore, GeoCacheStore, OrderStore, RepositoryError};
use crate::models::{GeoCacheEntry, NewOrder, Order, OrderItem, Product, Restaurant};

/// Storage backend kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Catalog products keyed by ID.
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
    /// Restaurants with their menus keyed by ID.
    restaurants: Arc<RwLock<BTreeMap<RestaurantId, Restaurant>>>,
    /// Orders without their lines.
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
    /// Order lines, tagged with their order.
    order_items: Arc<RwLock<Vec<(OrderId, OrderItem)>>>,
    /// Geocode cache keyed by normalized address.
    geocache: Arc<RwLock<HashMap<String, GeoCacheEntry>>>,
    next_order_id: Arc<AtomicI32>,
    next_order_item_id: Arc<AtomicI32>,
    /// Zero-based order line index at which `create_order` fails.
    fail_on_item: Option<usize>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_order` fail while writing the line at `index` (zero-based).
    ///
    /// Used to check that a failed order leaves nothing behind.
    #[must_use]
    pub const fn with_failure_on_item(mut self, index: usize) -> Self {
        self.fail_on_item = Some(index);
        self
    }

    /// Add or replace a catalog product.
    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Add or replace a restaurant and its menu.
    pub async fn insert_restaurant(&self, restaurant: Restaurant) {
        self.restaurants
            .write()
            .await
            .insert(restaurant.id, restaurant);
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Number of stored order lines across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.order_items.read().await.len()
    }

    fn next_id(counter: &AtomicI32) -> i32 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl GeoCacheStore for InMemoryStore {
    async fn find(&self, address: &Address) -> Result<Option<GeoCacheEntry>, RepositoryError> {
        Ok(self.geocache.read().await.get(address.as_str()).cloned())
    }

    async fn find_fresh(
        &self,
        address: &Address,
        not_before: DateTime<Utc>,
    ) -> Result<Option<GeoCacheEntry>, RepositoryError> {
        Ok(self
            .geocache
            .read()
            .await
            .get(address.as_str())
            .filter(|entry| entry.updated_at >= not_before)
            .cloned())
    }

    async fn upsert(&self, entry: &GeoCacheEntry) -> Result<(), RepositoryError> {
        self.geocache
            .write()
            .await
            .insert(entry.address.as_str().to_owned(), entry.clone());
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|product| ids.contains(&product.id))
            .cloned()
            .collect())
    }

    async fn available_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let restaurants = self.restaurants.read().await;
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|product| {
                restaurants
                    .values()
                    .any(|restaurant| restaurant.available_products().contains(&product.id))
            })
            .cloned()
            .collect())
    }

    async fn restaurants_with_menu(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self.restaurants.read().await.values().cloned().collect())
    }

    async fn restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self.restaurants.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        // Hold both write locks until commit so readers never see a partial order.
        let mut orders = self.orders.write().await;
        let mut order_items = self.order_items.write().await;
        let products = self.products.read().await;

        let id = OrderId::new(Self::next_id(&self.next_order_id));

        let mut staged = Vec::with_capacity(order.items.len());
        for (index, item) in order.items.iter().enumerate() {
            if self.fail_on_item == Some(index) {
                return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                    "injected failure on order item {index}"
                ))));
            }
            if !products.contains_key(&item.product_id) {
                return Err(RepositoryError::Conflict(format!(
                    "unknown product {}",
                    item.product_id
                )));
            }
            staged.push(OrderItem {
                id: OrderItemId::new(Self::next_id(&self.next_order_item_id)),
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            });
        }

        let stored = Order {
            id,
            firstname: order.firstname.clone(),
            lastname: order.lastname.clone(),
            phonenumber: order.phonenumber.clone(),
            address: order.address.clone(),
            coordinates: None,
            status: foodcart_core::OrderStatus::default(),
            payment_method: order.payment_method,
            comment: order.comment.clone(),
            registered_at: Utc::now(),
            called_at: None,
            delivered_at: None,
            assigned_restaurant: None,
            items: Vec::new(),
        };

        orders.insert(id, stored.clone());
        order_items.extend(staged.iter().map(|item| (id, *item)));

        Ok(Order {
            items: staged,
            ..stored
        })
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let Some(order) = orders.get(&id) else {
            return Ok(None);
        };

        let items = self
            .order_items
            .read()
            .await
            .iter()
            .filter(|(order_id, _)| *order_id == id)
            .map(|(_, item)| *item)
            .collect();

        Ok(Some(Order {
            items,
            ..order.clone()
        }))
    }

    async fn set_coordinates(
        &self,
        id: OrderId,
        coordinates: Coordinates,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.coordinates = Some(coordinates);
        Ok(())
    }

    async fn assign_restaurant(
        &self,
        id: OrderId,
        restaurant: RestaurantId,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.assigned_restaurant = Some(restaurant);
        Ok(())
    }
}
