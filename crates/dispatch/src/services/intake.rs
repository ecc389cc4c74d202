//! Order intake.
//!
//! Accepts customer orders, lists the restaurants that can fulfill them
//! nearest first, and records the restaurant an operator picks.
//!
//! Geolocation never blocks intake: an order whose address cannot be
//! resolved is still accepted, and its candidates are listed with unknown
//! distances.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use foodcart_core::{OrderId, RestaurantId};

use super::matcher;
use super::ranker::{self, RankedRestaurant};
use super::validation::{OrderDraft, ValidationError};
use crate::db::{CatalogStore, OrderStore, RepositoryError};
use crate::geo::GeoResolver;
use crate::models::{Order, OrderFields, Product};

/// Errors returned by [`OrderIntake`].
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The submission is invalid; nothing was stored.
    #[error("invalid order: {0}")]
    Validation(#[from] ValidationError),

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// No order with this ID.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// No restaurant with this ID.
    #[error("restaurant {0} not found")]
    RestaurantNotFound(RestaurantId),

    /// The restaurant does not sell every product in the order.
    #[error("restaurant {restaurant} cannot fulfill order {order}")]
    RestaurantNotSuitable {
        order: OrderId,
        restaurant: RestaurantId,
    },
}

/// Order intake service.
#[derive(Clone)]
pub struct OrderIntake {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    geo: Arc<GeoResolver>,
}

impl OrderIntake {
    /// Create an intake service over the given stores and resolver.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogStore>,
        geo: Arc<GeoResolver>,
    ) -> Self {
        Self {
            orders,
            catalog,
            geo,
        }
    }

    /// Validate and store a new order, then try to geolocate it.
    ///
    /// Line prices are snapshotted from the catalog. The order and all lines
    /// are stored atomically. A failed geolocation is logged and the order is
    /// returned without coordinates.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Validation` if the submission is invalid or
    /// references unknown products, and `IntakeError::Storage` if the order
    /// could not be stored.
    #[instrument(skip(self, fields))]
    pub async fn create_order(&self, fields: OrderFields) -> Result<Order, IntakeError> {
        let draft = OrderDraft::validate(fields)?;
        let products = self.catalog.products_by_ids(&draft.product_ids()).await?;
        let new_order = draft.price(&products)?;

        let mut order = self.orders.create_order(&new_order).await?;
        info!(
            order_id = %order.id,
            items = order.items.len(),
            total = %order.total(),
            "Order created"
        );

        match self.geo.resolve(&order.address).await {
            Ok(coordinates) => match self.orders.set_coordinates(order.id, coordinates).await {
                Ok(()) => order.coordinates = Some(coordinates),
                Err(e) => tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "Failed to store order coordinates"
                ),
            },
            Err(e) => warn!(
                order_id = %order.id,
                error = %e,
                "Order address not geolocated, continuing without coordinates"
            ),
        }

        Ok(order)
    }

    /// Load an order.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::OrderNotFound` if there is no such order.
    pub async fn order(&self, id: OrderId) -> Result<Order, IntakeError> {
        self.orders
            .order(id)
            .await?
            .ok_or(IntakeError::OrderNotFound(id))
    }

    /// Restaurants able to fulfill `order`, nearest first.
    ///
    /// Restaurants without stored coordinates are located through the
    /// resolver. Those that still cannot be located are listed last.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Storage` if restaurants cannot be loaded.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn candidates_for(&self, order: &Order) -> Result<Vec<RankedRestaurant>, IntakeError> {
        let restaurants = self.catalog.restaurants_with_menu().await?;
        let suitable = matcher::suitable(order.required_products(), restaurants);

        let geo = &self.geo;
        let ranked = ranker::rank_with(order.coordinates, suitable, move |address| async move {
            geo.resolve(&address).await
        })
        .await;

        info!(candidates = ranked.len(), "Listed candidate restaurants");
        Ok(ranked)
    }

    /// Candidates for the order with the given ID.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::OrderNotFound` if there is no such order, or
    /// `IntakeError::Storage` if storage fails.
    pub async fn candidates_for_id(
        &self,
        id: OrderId,
    ) -> Result<Vec<RankedRestaurant>, IntakeError> {
        let order = self.order(id).await?;
        self.candidates_for(&order).await
    }

    /// Assign a restaurant to fulfill an order.
    ///
    /// Only the assignment changes; status and timestamps are left alone.
    ///
    /// # Errors
    ///
    /// - `IntakeError::OrderNotFound` / `IntakeError::RestaurantNotFound` for unknown IDs
    /// - `IntakeError::RestaurantNotSuitable` if the restaurant lacks a product
    /// - `IntakeError::Storage` if storage fails
    #[instrument(skip(self))]
    pub async fn assign_restaurant(
        &self,
        order_id: OrderId,
        restaurant_id: RestaurantId,
    ) -> Result<(), IntakeError> {
        let order = self.order(order_id).await?;
        let restaurant = self
            .catalog
            .restaurant(restaurant_id)
            .await?
            .ok_or(IntakeError::RestaurantNotFound(restaurant_id))?;

        let required: HashSet<_> = order.required_products().collect();
        if !matcher::can_fulfill(&required, &restaurant) {
            return Err(IntakeError::RestaurantNotSuitable {
                order: order_id,
                restaurant: restaurant_id,
            });
        }

        self.orders
            .assign_restaurant(order_id, restaurant_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => IntakeError::OrderNotFound(order_id),
                other => IntakeError::Storage(other),
            })?;

        info!("Restaurant assigned");
        Ok(())
    }

    /// Products that at least one restaurant currently sells.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Storage` if the catalog cannot be read.
    pub async fn available_products(&self) -> Result<Vec<Product>, IntakeError> {
        Ok(self.catalog.available_products().await?)
    }
}

impl std::fmt::Debug for OrderIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderIntake")
            .field("geo", &self.geo)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use foodcart_core::{Address, Coordinates, Price, ProductId};

    use super::*;
    use crate::db::InMemoryStore;
    use crate::geo::{GeoError, Geocoder};
    use crate::models::{MenuItem, OrderItemFields, Restaurant};

    /// Geocoder that only knows a fixed set of addresses.
    struct MapGeocoder(Vec<(&'static str, Coordinates)>);

    #[async_trait]
    impl Geocoder for MapGeocoder {
        fn name(&self) -> &'static str {
            "map"
        }

        async fn geocode(&self, address: &Address) -> Result<Vec<Coordinates>, GeoError> {
            Ok(self
                .0
                .iter()
                .filter(|(known, _)| *known == address.as_str())
                .map(|(_, coordinates)| *coordinates)
                .collect())
        }
    }

    fn coords(lat: &str, lon: &str) -> Coordinates {
        Coordinates::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
    }

    async fn setup(known: Vec<(&'static str, Coordinates)>) -> (OrderIntake, InMemoryStore) {
        let store = InMemoryStore::new();
        for (id, cents) in [(1, 35_000), (2, 9_950)] {
            store
                .insert_product(crate::models::Product {
                    id: ProductId::new(id),
                    name: format!("Product {id}"),
                    price: Price::new(Decimal::new(cents, 2)).unwrap(),
                    category: None,
                    description: String::new(),
                    special_status: false,
                })
                .await;
        }
        store
            .insert_restaurant(Restaurant {
                id: RestaurantId::new(1),
                name: "Near".to_string(),
                address: None,
                contact_phone: String::new(),
                coordinates: Some(coords("55.76", "37.62")),
                menu: vec![
                    MenuItem {
                        product_id: ProductId::new(1),
                        available: true,
                    },
                    MenuItem {
                        product_id: ProductId::new(2),
                        available: true,
                    },
                ],
            })
            .await;
        store
            .insert_restaurant(Restaurant {
                id: RestaurantId::new(2),
                name: "Burgers only".to_string(),
                address: None,
                contact_phone: String::new(),
                coordinates: Some(coords("55.75", "37.61")),
                menu: vec![MenuItem {
                    product_id: ProductId::new(1),
                    available: true,
                }],
            })
            .await;

        let shared = Arc::new(store.clone());
        let geo = Arc::new(GeoResolver::new(Arc::new(MapGeocoder(known)), shared.clone()));
        (OrderIntake::new(shared.clone(), shared, geo), store)
    }

    fn fields(address: &str, products: &[(i32, i64)]) -> OrderFields {
        OrderFields {
            firstname: Some("Ivan".to_string()),
            lastname: Some("Petrov".to_string()),
            phonenumber: Some("+79991234567".to_string()),
            address: Some(address.to_string()),
            products: Some(
                products
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

    #[tokio::test]
    async fn test_create_order_geolocates() {
        let (intake, _) = setup(vec![("Moscow, Tverskaya 1", coords("55.75", "37.61"))]).await;

        let order = intake
            .create_order(fields("Moscow, Tverskaya 1", &[(1, 2), (2, 1)]))
            .await
            .unwrap();

        assert_eq!(order.coordinates, Some(coords("55.75", "37.61")));
        assert_eq!(order.total().amount(), Decimal::new(79_950, 2));
        let stored = intake.order(order.id).await.unwrap();
        assert_eq!(stored.coordinates, order.coordinates);
    }

    #[tokio::test]
    async fn test_create_order_unknown_address_still_accepted() {
        let (intake, _) = setup(Vec::new()).await;

        let order = intake
            .create_order(fields("Atlantis", &[(1, 1)]))
            .await
            .unwrap();

        assert!(order.coordinates.is_none());
        assert!(intake.order(order.id).await.unwrap().coordinates.is_none());
    }

    #[tokio::test]
    async fn test_create_order_invalid_stores_nothing() {
        let (intake, store) = setup(Vec::new()).await;

        let result = intake.create_order(fields("Atlantis", &[(1, 0)])).await;

        assert!(matches!(result, Err(IntakeError::Validation(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_order_unknown_product() {
        let (intake, store) = setup(Vec::new()).await;

        let result = intake.create_order(fields("Atlantis", &[(99, 1)])).await;

        assert!(matches!(
            result,
            Err(IntakeError::Validation(ValidationError::UnknownProduct { .. }))
        ));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_candidates_filtered_and_ranked() {
        let (intake, _) = setup(vec![("Moscow, Tverskaya 1", coords("55.75", "37.61"))]).await;
        let order = intake
            .create_order(fields("Moscow, Tverskaya 1", &[(1, 1)]))
            .await
            .unwrap();

        let candidates = intake.candidates_for(&order).await.unwrap();
        let ids: Vec<i32> = candidates.iter().map(|c| c.restaurant.id.as_i32()).collect();

        // Restaurant 2 sits on the order's coordinates
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_assign_rejects_unsuitable_restaurant() {
        let (intake, _) = setup(Vec::new()).await;
        let order = intake
            .create_order(fields("Atlantis", &[(1, 1), (2, 1)]))
            .await
            .unwrap();

        let result = intake.assign_restaurant(order.id, RestaurantId::new(2)).await;

        assert!(matches!(result, Err(IntakeError::RestaurantNotSuitable { .. })));
        assert!(intake.order(order.id).await.unwrap().assigned_restaurant.is_none());
    }

    #[tokio::test]
    async fn test_assign_suitable_restaurant() {
        let (intake, _) = setup(Vec::new()).await;
        let order = intake
            .create_order(fields("Atlantis", &[(1, 1), (2, 1)]))
            .await
            .unwrap();

        intake
            .assign_restaurant(order.id, RestaurantId::new(1))
            .await
            .unwrap();

        let stored = intake.order(order.id).await.unwrap();
        assert_eq!(stored.assigned_restaurant, Some(RestaurantId::new(1)));
        assert_eq!(stored.status, order.status);
    }

    #[tokio::test]
    async fn test_assign_unknown_ids() {
        let (intake, _) = setup(Vec::new()).await;

        assert!(matches!(
            intake
                .assign_restaurant(OrderId::new(404), RestaurantId::new(1))
                .await,
            Err(IntakeError::OrderNotFound(_))
        ));

        let order = intake
            .create_order(fields("Atlantis", &[(1, 1)]))
            .await
            .unwrap();
        assert!(matches!(
            intake
                .assign_restaurant(order.id, RestaurantId::new(404))
                .await,
            Err(IntakeError::RestaurantNotFound(_))
        ));
    }
}
