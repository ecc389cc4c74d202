//! Order repository.
//!
//! Orders and their lines are written in one transaction, so a failure on
//! any line leaves neither the order nor its earlier lines behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use foodcart_core::{
    Address, Coordinates, OrderId, OrderItemId, OrderStatus, PaymentMethod, PhoneNumber, Price,
    ProductId, Quantity, RestaurantId,
};

use super::{OrderStore, RepositoryError, coordinates_from_columns};
use crate::models::{NewOrder, Order, OrderItem};

/// `PostgreSQL` order storage.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    firstname: String,
    lastname: String,
    phonenumber: String,
    address: String,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    status: OrderStatus,
    payment_method: PaymentMethod,
    comment: String,
    registered_at: DateTime<Utc>,
    called_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    assigned_restaurant_id: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity on order item {}: {e}", row.id))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price on order item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity,
            price,
        })
    }
}

fn order_from_rows(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, RepositoryError> {
    let phonenumber = PhoneNumber::parse(&row.phonenumber).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid phone number in database: {e}"))
    })?;
    let address = Address::parse(&row.address).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid address in database: {e}"))
    })?;
    let items = items
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Order {
        id: OrderId::new(row.id),
        firstname: row.firstname,
        lastname: row.lastname,
        phonenumber,
        address,
        coordinates: coordinates_from_columns(row.latitude, row.longitude)?,
        status: row.status,
        payment_method: row.payment_method,
        comment: row.comment,
        registered_at: row.registered_at,
        called_at: row.called_at,
        delivered_at: row.delivered_at,
        assigned_restaurant: row.assigned_restaurant_id.map(RestaurantId::new),
        items,
    })
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO foodcart.customer_order
                (firstname, lastname, phonenumber, address, payment_method, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, firstname, lastname, phonenumber, address, latitude, longitude,
                      status, payment_method, comment, registered_at, called_at,
                      delivered_at, assigned_restaurant_id
            ",
        )
        .bind(&order.firstname)
        .bind(&order.lastname)
        .bind(order.phonenumber.as_str())
        .bind(&order.address)
        .bind(order.payment_method)
        .bind(&order.comment)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let item_row = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO foodcart.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, product_id, quantity, price
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity.get())
            .bind(item.price.amount())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    RepositoryError::Conflict(format!("unknown product {}", item.product_id))
                }
                other => RepositoryError::Database(other),
            })?;
            items.push(item_row);
        }

        tx.commit().await?;

        order_from_rows(row, items)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, firstname, lastname, phonenumber, address, latitude, longitude,
                   status, payment_method, comment, registered_at, called_at,
                   delivered_at, assigned_restaurant_id
            FROM foodcart.customer_order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, quantity, price
            FROM foodcart.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        order_from_rows(row, items).map(Some)
    }

    async fn set_coordinates(
        &self,
        id: OrderId,
        coordinates: Coordinates,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE foodcart.customer_order
            SET latitude = $1, longitude = $2
            WHERE id = $3
            ",
        )
        .bind(coordinates.latitude())
        .bind(coordinates.longitude())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn assign_restaurant(
        &self,
        id: OrderId,
        restaurant: RestaurantId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE foodcart.customer_order
            SET assigned_restaurant_id = $1
            WHERE id = $2
            ",
        )
        .bind(restaurant)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
