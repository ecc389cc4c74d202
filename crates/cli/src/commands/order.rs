//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! # Place an order
//! fc-cli order place --file order.json
//! echo '{"firstname": "Ivan", ...}' | fc-cli order place --file -
//!
//! # Inspect and route it
//! fc-cli order show 42
//! fc-cli order candidates 42
//! fc-cli order assign 42 3
//! ```
//!
//! # Submission Format
//!
//! ```json
//! {
//!   "firstname": "Ivan",
//!   "lastname": "Petrov",
//!   "phonenumber": "+7 999 123-45-67",
//!   "address": "Moscow, Tverskaya 1",
//!   "products": [{"product": 1, "quantity": 2}],
//!   "payment_method": "CASH",
//!   "comment": "Ring twice"
//! }
//! ```

use std::io::Read;

use serde::Serialize;

use foodcart_core::{OrderId, Price, RestaurantId};
use foodcart_dispatch::error::{AppError, Result};
use foodcart_dispatch::models::{Order, OrderFields};
use foodcart_dispatch::state::AppState;

use super::print_json;

#[derive(Serialize)]
struct OrderView<'a> {
    #[serde(flatten)]
    order: &'a Order,
    total: Price,
}

impl<'a> OrderView<'a> {
    fn new(order: &'a Order) -> Self {
        Self {
            order,
            total: order.total(),
        }
    }
}

/// Place an order from the JSON submission at `path` (`-` for stdin).
pub async fn place(state: &AppState, path: &str) -> Result<()> {
    let raw = read_submission(path).await?;
    let fields: OrderFields = serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("invalid order JSON: {e}")))?;

    let order = state.intake().create_order(fields).await?;
    print_json(&OrderView::new(&order))
}

/// Print an order with its total.
pub async fn show(state: &AppState, id: i32) -> Result<()> {
    let order = state.intake().order(OrderId::new(id)).await?;
    print_json(&OrderView::new(&order))
}

/// Print restaurants able to fulfill an order, nearest first.
pub async fn candidates(state: &AppState, id: i32) -> Result<()> {
    let candidates = state.intake().candidates_for_id(OrderId::new(id)).await?;
    print_json(&candidates)
}

/// Assign a restaurant to an order.
pub async fn assign(state: &AppState, id: i32, restaurant: i32) -> Result<()> {
    state
        .intake()
        .assign_restaurant(OrderId::new(id), RestaurantId::new(restaurant))
        .await?;
    tracing::info!(order_id = id, restaurant_id = restaurant, "Order assigned");
    Ok(())
}

async fn read_submission(path: &str) -> Result<String> {
    if path == "-" {
        return tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        })
        .await
        .map_err(|e| AppError::BadRequest(format!("cannot read stdin: {e}")))?
        .map_err(|e| AppError::BadRequest(format!("cannot read stdin: {e}")));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::BadRequest(format!("cannot read {path}: {e}")))
}
