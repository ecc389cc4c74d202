//! Core types for Foodcart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod coordinates;
pub mod id;
pub mod phone;
pub mod price;
pub mod quantity;
pub mod status;

pub use address::{Address, AddressError};
pub use coordinates::{Coordinates, CoordinatesError};
pub use id::*;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
