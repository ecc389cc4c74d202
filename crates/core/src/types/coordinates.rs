//! Geographic coordinates and great-circle distance.

use core::fmt;

use geo::{Distance, Haversine, Point};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building [`Coordinates`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatesError {
    /// Latitude outside of [-90, 90].
    #[error("latitude {0} is out of range [-90, 90]")]
    LatitudeOutOfRange(Decimal),
    /// Longitude outside of [-180, 180].
    #[error("longitude {0} is out of range [-180, 180]")]
    LongitudeOutOfRange(Decimal),
    /// Only one half of the pair is present.
    #[error("coordinates must have both latitude and longitude or neither")]
    Incomplete,
}

/// A latitude/longitude pair with fixed precision.
///
/// Both components are rounded half away from zero to
/// [`Coordinates::SCALE`] fractional digits (about 0.1 m), the same way the
/// `NUMERIC(9, 6)` columns they are stored in round.
///
/// ## Examples
///
/// ```
/// use foodcart_core::Coordinates;
/// use rust_decimal::Decimal;
///
/// let red_square = Coordinates::new(Decimal::new(557558, 4), Decimal::new(376176, 4)).unwrap();
/// assert_eq!(red_square.latitude().to_string(), "55.755800");
///
/// assert!(Coordinates::new(Decimal::from(91), Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: Decimal,
    longitude: Decimal,
}

#[derive(Deserialize)]
struct RawCoordinates {
    latitude: Decimal,
    longitude: Decimal,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = CoordinatesError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinates {
    /// Number of fractional digits kept for each component.
    pub const SCALE: u32 = 6;

    /// Build coordinates, validating ranges and rounding to [`Self::SCALE`].
    ///
    /// # Errors
    ///
    /// Returns an error if latitude is outside [-90, 90] or longitude is
    /// outside [-180, 180].
    pub fn new(latitude: Decimal, longitude: Decimal) -> Result<Self, CoordinatesError> {
        let mut latitude = Self::round(latitude);
        let mut longitude = Self::round(longitude);

        if latitude.abs() > Decimal::from(90) {
            return Err(CoordinatesError::LatitudeOutOfRange(latitude));
        }
        if longitude.abs() > Decimal::from(180) {
            return Err(CoordinatesError::LongitudeOutOfRange(longitude));
        }

        latitude.rescale(Self::SCALE);
        longitude.rescale(Self::SCALE);

        Ok(Self {
            latitude,
            longitude,
        })
    }

    fn round(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Assemble coordinates from two nullable storage columns.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatesError::Incomplete`] when exactly one column is set,
    /// or a range error when the values are invalid.
    pub fn from_parts(
        latitude: Option<Decimal>,
        longitude: Option<Decimal>,
    ) -> Result<Option<Self>, CoordinatesError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(CoordinatesError::Incomplete),
        }
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> Decimal {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> Decimal {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometers.
    ///
    /// Haversine on a sphere of mean Earth radius (6371.0088 km).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        Haversine.distance(self.point(), other.point()) / 1000.0
    }

    /// The coordinates as a `geo` point (`x` is longitude).
    #[must_use]
    pub fn point(&self) -> Point<f64> {
        // In-range NUMERIC(9, 6) values always fit in an f64.
        Point::new(
            self.longitude.to_f64().unwrap_or_default(),
            self.latitude.to_f64().unwrap_or_default(),
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}
