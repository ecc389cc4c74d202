//! Geocode cache entries.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use foodcart_core::{Address, Coordinates};

/// A cached address resolution.
///
/// At most one entry exists per normalized address; re-resolving an address
/// replaces the coordinates and timestamp together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    /// Normalized address (unique key).
    pub address: Address,
    /// Resolved coordinates.
    pub coordinates: Coordinates,
    /// When the coordinates were last resolved.
    pub updated_at: DateTime<Utc>,
}

impl GeoCacheEntry {
    /// Whether the entry is still within `window` at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.updated_at >= now - window
    }
}
