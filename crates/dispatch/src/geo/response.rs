//! Yandex Geocoder response format.
//!
//! Only the path to each place's point is modeled:
//!
//! ```json
//! {"response": {"GeoObjectCollection": {"featureMember": [
//!     {"GeoObject": {"Point": {"pos": "37.617698 55.755864"}}}
//! ]}}}
//! ```
//!
//! `pos` is "longitude latitude", the reverse of [`Coordinates::new`].

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use foodcart_core::Coordinates;

use super::GeoError;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseBody {
    geo_object_collection: GeoObjectCollection,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember")]
    feature_member: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FeatureMember {
    geo_object: GeoObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeoObject {
    point: Point,
}

#[derive(Debug, Deserialize)]
struct Point {
    pos: String,
}

/// Parse a geocoder response body into candidate places, in response order.
///
/// # Errors
///
/// Returns [`GeoError::MalformedResponse`] if the body does not follow the
/// expected structure or any place has an unreadable position.
pub fn parse_places(body: &str) -> Result<Vec<Coordinates>, GeoError> {
    let parsed: GeocodeResponse = serde_json::from_str(body)
        .map_err(|e| GeoError::MalformedResponse(format!("unexpected structure: {e}")))?;

    parsed
        .response
        .geo_object_collection
        .feature_member
        .iter()
        .map(|member| parse_pos(&member.geo_object.point.pos))
        .collect()
}

/// Parse a "longitude latitude" position string.
///
/// # Errors
///
/// Returns [`GeoError::MalformedResponse`] unless `pos` holds exactly two
/// in-range decimal numbers.
pub fn parse_pos(pos: &str) -> Result<Coordinates, GeoError> {
    let mut parts = pos.split_whitespace();
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GeoError::MalformedResponse(format!(
            "expected 'longitude latitude', got '{pos}'"
        )));
    };

    let longitude = Decimal::from_str(lon)
        .map_err(|e| GeoError::MalformedResponse(format!("invalid longitude '{lon}': {e}")))?;
    let latitude = Decimal::from_str(lat)
        .map_err(|e| GeoError::MalformedResponse(format!("invalid latitude '{lat}': {e}")))?;

    Coordinates::new(latitude, longitude).map_err(|e| GeoError::MalformedResponse(e.to_string()))
}
