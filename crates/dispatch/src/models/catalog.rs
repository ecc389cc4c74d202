//! Products and restaurants, read-only to dispatch.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use foodcart_core::{Address, Coordinates, Price, ProductId, RestaurantId};

/// A product that restaurants can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current menu price.
    pub price: Price,
    /// Category name, if categorized.
    pub category: Option<String>,
    /// Free-form description.
    pub description: String,
    /// Whether the product is a special offer.
    pub special_status: bool,
}

/// One line of a restaurant menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Offered product.
    pub product_id: ProductId,
    /// Whether the product is currently for sale.
    pub available: bool,
}

/// A restaurant together with its menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    /// Unique restaurant ID.
    pub id: RestaurantId,
    /// Display name.
    pub name: String,
    /// Street address, if known.
    pub address: Option<Address>,
    /// Contact phone as entered by staff.
    pub contact_phone: String,
    /// Stored coordinates, if the address has been geolocated.
    pub coordinates: Option<Coordinates>,
    /// Menu lines, available or not.
    pub menu: Vec<MenuItem>,
}

impl Restaurant {
    /// Products this restaurant currently sells.
    #[must_use]
    pub fn available_products(&self) -> HashSet<ProductId> {
        self.menu
            .iter()
            .filter(|item| item.available)
            .map(|item| item.product_id)
            .collect()
    }
}
