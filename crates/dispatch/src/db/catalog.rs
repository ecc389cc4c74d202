//! Restaurant catalog repository.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use foodcart_core::{Address, Price, ProductId, RestaurantId};

use super::{CatalogStore, RepositoryError, coordinates_from_columns};
use crate::models::{MenuItem, Product, Restaurant};

/// `PostgreSQL` catalog of products and restaurants.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    category: Option<String>,
    description: String,
    special_status: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            category: row.category,
            description: row.description,
            special_status: row.special_status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RestaurantRow {
    id: i32,
    name: String,
    address: String,
    contact_phone: String,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    restaurant_id: i32,
    product_id: i32,
    availability: bool,
}

const PRODUCT_COLUMNS: &str = r"
    SELECT p.id, p.name, p.price, c.name AS category, p.description, p.special_status
    FROM foodcart.product p
    LEFT JOIN foodcart.product_category c ON c.id = p.category_id
";

impl CatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_menus(
        &self,
        restaurant: Option<RestaurantId>,
    ) -> Result<HashMap<RestaurantId, Vec<MenuItem>>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            r"
            SELECT restaurant_id, product_id, availability
            FROM foodcart.restaurant_menu_item
            WHERE $1::INTEGER IS NULL OR restaurant_id = $1
            ORDER BY restaurant_id, product_id
            ",
        )
        .bind(restaurant.map(|id| id.as_i32()))
        .fetch_all(&self.pool)
        .await?;

        let mut menus: HashMap<RestaurantId, Vec<MenuItem>> = HashMap::new();
        for row in rows {
            menus
                .entry(RestaurantId::new(row.restaurant_id))
                .or_default()
                .push(MenuItem {
                    product_id: ProductId::new(row.product_id),
                    available: row.availability,
                });
        }
        Ok(menus)
    }
}

fn restaurant_from_row(
    row: RestaurantRow,
    menus: &mut HashMap<RestaurantId, Vec<MenuItem>>,
) -> Result<Restaurant, RepositoryError> {
    let id = RestaurantId::new(row.id);
    Ok(Restaurant {
        id,
        name: row.name,
        // Blank addresses are allowed for restaurants
        address: Address::parse(&row.address).ok(),
        contact_phone: row.contact_phone,
        coordinates: coordinates_from_columns(row.latitude, row.longitude)?,
        menu: menus.remove(&id).unwrap_or_default(),
    })
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_COLUMNS} WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn available_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"{PRODUCT_COLUMNS}
            WHERE EXISTS (
                SELECT 1 FROM foodcart.restaurant_menu_item m
                WHERE m.product_id = p.id AND m.availability
            )
            ORDER BY p.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn restaurants_with_menu(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query_as::<_, RestaurantRow>(
            r"
            SELECT id, name, address, contact_phone, latitude, longitude
            FROM foodcart.restaurant
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut menus = self.load_menus(None).await?;
        rows.into_iter()
            .map(|row| restaurant_from_row(row, &mut menus))
            .collect()
    }

    async fn restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(
            r"
            SELECT id, name, address, contact_phone, latitude, longitude
            FROM foodcart.restaurant
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut menus = self.load_menus(Some(id)).await?;
        restaurant_from_row(row, &mut menus).map(Some)
    }
}
