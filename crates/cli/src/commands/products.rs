//! Product listing command.

use foodcart_dispatch::error::Result;
use foodcart_dispatch::state::AppState;

use super::print_json;

/// Print products available in at least one restaurant.
pub async fn list(state: &AppState) -> Result<()> {
    let products = state.intake().available_products().await?;
    tracing::debug!(count = products.len(), "Loaded available products");
    print_json(&products)
}
