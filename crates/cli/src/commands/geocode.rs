//! Address resolution command.
//!
//! # Usage
//!
//! ```bash
//! fc-cli geocode "Moscow, Tverskaya 1"
//! ```
//!
//! Answers from the geocode cache when a fresh entry exists, otherwise asks
//! the geocoder and refreshes the cache.

use serde::Serialize;

use foodcart_core::{Address, Coordinates};
use foodcart_dispatch::error::{AppError, Result};
use foodcart_dispatch::state::AppState;

use super::print_json;

#[derive(Serialize)]
struct Resolved<'a> {
    address: &'a Address,
    #[serde(flatten)]
    coordinates: Coordinates,
}

/// Resolve `address` and print its coordinates.
pub async fn resolve(state: &AppState, address: &str) -> Result<()> {
    let address = Address::parse(address).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let coordinates = state.resolver().resolve(&address).await?;

    print_json(&Resolved {
        address: &address,
        coordinates,
    })
}
