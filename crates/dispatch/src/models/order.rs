//! Orders and their line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodcart_core::{
    Address, Coordinates, OrderId, OrderItemId, OrderStatus, PaymentMethod, PhoneNumber, Price,
    ProductId, Quantity, QuantityError, RestaurantId,
};

// =============================================================================
// Raw Input
// =============================================================================

/// Unvalidated order submission, as received from a client.
///
/// Every field is optional so that a missing field is reported by order
/// validation with its name instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFields {
    /// Customer first name.
    #[serde(default)]
    pub firstname: Option<String>,
    /// Customer last name.
    #[serde(default)]
    pub lastname: Option<String>,
    /// Customer phone number.
    #[serde(default)]
    pub phonenumber: Option<String>,
    /// Delivery address.
    #[serde(default)]
    pub address: Option<String>,
    /// Requested line items.
    #[serde(default)]
    pub products: Option<Vec<OrderItemFields>>,
    /// Payment method, `NOT_INDICATED` when absent.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Free-form comment for the operator.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Unvalidated order line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItemFields {
    /// Product ID.
    #[serde(default)]
    pub product: Option<i32>,
    /// Requested quantity.
    #[serde(default)]
    pub quantity: Option<QuantityInput>,
}

/// A quantity as submitted: a JSON number or numeric text such as `"2"`.
///
/// Text is only parsed during validation, so a bad value is reported
/// against its line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(i64),
    Text(String),
}

impl QuantityInput {
    /// Convert to a validated [`Quantity`].
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError`] for non-numeric text or values outside 1..=100.
    pub fn to_quantity(&self) -> Result<Quantity, QuantityError> {
        match self {
            Self::Number(value) => Quantity::new(*value),
            Self::Text(text) => text.parse(),
        }
    }
}

impl From<i64> for QuantityInput {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

// =============================================================================
// Validated Input
// =============================================================================

/// A validated order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub firstname: String,
    pub lastname: String,
    pub phonenumber: PhoneNumber,
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub comment: String,
    pub items: Vec<NewOrderItem>,
}

/// A validated order line with its price snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Product price at the time the order was placed.
    pub price: Price,
}

// =============================================================================
// Persisted Order
// =============================================================================

/// A persisted customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub firstname: String,
    pub lastname: String,
    pub phonenumber: PhoneNumber,
    pub address: Address,
    /// Delivery coordinates, absent when the address could not be resolved.
    pub coordinates: Option<Coordinates>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub comment: String,
    pub registered_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Restaurant chosen to fulfill the order.
    pub assigned_restaurant: Option<RestaurantId>,
    pub items: Vec<OrderItem>,
}

/// A persisted order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Unit price captured when the order was placed.
    pub price: Price,
}

impl Order {
    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items
            .iter()
            .map(|item| item.price.times(item.quantity))
            .sum()
    }

    /// Products this order needs, one per line.
    pub fn required_products(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(|item| item.product_id)
    }
}
