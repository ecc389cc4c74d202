//! Restaurant suitability.
//!
//! A restaurant is suitable for an order when every product the order needs
//! is available on its menu. Menu lines marked unavailable do not count.

use std::collections::HashSet;

use foodcart_core::ProductId;

use crate::models::Restaurant;

/// Keep the restaurants that can fulfill every product in `required`.
///
/// Input order is preserved. An empty requirement is met by every restaurant.
#[must_use]
pub fn suitable<I>(required: I, restaurants: Vec<Restaurant>) -> Vec<Restaurant>
where
    I: IntoIterator<Item = ProductId>,
{
    let required: HashSet<ProductId> = required.into_iter().collect();
    restaurants
        .into_iter()
        .filter(|restaurant| can_fulfill(&required, restaurant))
        .collect()
}

/// Whether `restaurant` sells every product in `required`.
#[must_use]
pub fn can_fulfill(required: &HashSet<ProductId>, restaurant: &Restaurant) -> bool {
    required.is_subset(&restaurant.available_products())
}
