//! Domain models for order dispatch.

pub mod catalog;
pub mod geocache;
pub mod order;

pub use catalog::{MenuItem, Product, Restaurant};
pub use geocache::GeoCacheEntry;
pub use order::{
    NewOrder, NewOrderItem, Order, OrderFields, OrderItem, OrderItemFields, QuantityInput,
};
