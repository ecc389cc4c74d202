//! Foodcart Core - Shared domain types.
//!
//! This crate provides the value types used across all Foodcart components:
//! - `dispatch` - Order intake, geocoding and restaurant routing
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, coordinates, addresses, phone numbers,
//!   prices, quantities and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
