//! Dispatch services.
//!
//! - [`matcher`] - Which restaurants can cook a whole order
//! - [`ranker`] - Ordering restaurants by distance to the customer
//! - [`validation`] - Checking raw order submissions
//! - [`intake`] - Order creation, candidate listing and assignment

pub mod intake;
pub mod matcher;
pub mod ranker;
pub mod validation;

pub use intake::{IntakeError, OrderIntake};
pub use ranker::RankedRestaurant;
pub use validation::ValidationError;
