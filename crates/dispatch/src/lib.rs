//! Foodcart Dispatch library.
//!
//! Order intake and fulfillment routing: resolves delivery addresses to
//! coordinates through a time-bounded geocode cache, finds the restaurants
//! whose available menu covers an order, and ranks them by distance.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Storage traits with `PostgreSQL` and in-memory backends
//! - [`geo`] - Geocoding client and the caching [`geo::GeoResolver`]
//! - [`services`] - Restaurant matching, distance ranking and order intake
//! - [`state`] - Wiring of the above for binaries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod models;
pub mod services;
pub mod state;
