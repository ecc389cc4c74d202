//! Distance ranking of candidate restaurants.
//!
//! Restaurants are ordered nearest first by great-circle distance from the
//! order. A restaurant whose distance is unknown (no order location or no
//! restaurant location) sorts after every known distance. Ties keep their
//! input order.

use std::cmp::Ordering;
use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use tracing::debug;

use foodcart_core::{Address, Coordinates};

use crate::models::Restaurant;

/// A restaurant with its distance from the order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRestaurant {
    pub restaurant: Restaurant,
    /// Distance in kilometers, `None` when it cannot be computed.
    pub distance_km: Option<f64>,
}

/// Rank restaurants using their stored coordinates only.
#[must_use]
pub fn rank(origin: Option<Coordinates>, restaurants: Vec<Restaurant>) -> Vec<RankedRestaurant> {
    let ranked = restaurants
        .into_iter()
        .map(|restaurant| {
            let distance_km = distance(origin, restaurant.coordinates);
            RankedRestaurant {
                restaurant,
                distance_km,
            }
        })
        .collect();
    sorted(ranked)
}

/// Rank restaurants, calling `locate` for each restaurant that has an
/// address but no stored coordinates.
///
/// A failed `locate` leaves that restaurant's distance unknown; the rest of
/// the ranking is unaffected. Failures are logged at `debug` only, so
/// `locate` is expected to report them itself. Nothing is located when `origin` is `None`.
pub async fn rank_with<F, Fut, E>(
    origin: Option<Coordinates>,
    restaurants: Vec<Restaurant>,
    mut locate: F,
) -> Vec<RankedRestaurant>
where
    F: FnMut(Address) -> Fut,
    Fut: Future<Output = Result<Coordinates, E>>,
    E: Display,
{
    let mut ranked = Vec::with_capacity(restaurants.len());
    for restaurant in restaurants {
        let location = match (origin, restaurant.coordinates, &restaurant.address) {
            (None, _, _) => None,
            (Some(_), Some(stored), _) => Some(stored),
            (Some(_), None, Some(address)) => match locate(address.clone()).await {
                Ok(located) => Some(located),
                Err(e) => {
                    // The locator has already reported the failure
                    debug!(
                        restaurant_id = %restaurant.id,
                        error = %e,
                        "Could not locate restaurant, distance unknown"
                    );
                    None
                }
            },
            (Some(_), None, None) => None,
        };

        ranked.push(RankedRestaurant {
            distance_km: distance(origin, location),
            restaurant,
        });
    }
    sorted(ranked)
}

fn distance(origin: Option<Coordinates>, location: Option<Coordinates>) -> Option<f64> {
    Some(origin?.distance_km(&location?))
}

fn sorted(mut ranked: Vec<RankedRestaurant>) -> Vec<RankedRestaurant> {
    // Stable, so equal distances keep input order
    ranked.sort_by(|a, b| compare_distance(a.distance_km, b.distance_km));
    ranked
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use rust_decimal::Decimal;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use foodcart_core::RestaurantId;

    use super::*;

    fn coords(lat: &str, lon: &str) -> Coordinates {
        Coordinates::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
    }

    fn restaurant(id: i32, coordinates: Option<Coordinates>, address: Option<&str>) -> Restaurant {
        Restaurant {
            id: RestaurantId::new(id),
            name: format!("Restaurant {id}"),
            address: address.map(|a| Address::parse(a).unwrap()),
            contact_phone: String::new(),
            coordinates,
            menu: Vec::new(),
        }
    }

    fn ids(ranked: &[RankedRestaurant]) -> Vec<i32> {
        ranked.iter().map(|r| r.restaurant.id.as_i32()).collect()
    }

    #[test]
    fn test_rank_nearest_first() {
        let origin = coords("55.75", "37.61");
        let ranked = rank(
            Some(origin),
            vec![
                restaurant(1, Some(coords("59.93", "30.31")), None),
                restaurant(2, Some(coords("55.76", "37.62")), None),
            ],
        );

        assert_eq!(ids(&ranked), vec![2, 1]);
        let nearest = ranked[0].distance_km.unwrap();
        assert!((1.2..1.35).contains(&nearest), "unexpected distance {nearest}");
    }

    #[test]
    fn test_rank_unknown_distance_sorts_last() {
        let ranked = rank(
            Some(coords("55.75", "37.61")),
            vec![
                restaurant(1, None, None),
                restaurant(2, Some(coords("55.76", "37.62")), None),
                restaurant(3, None, None),
            ],
        );

        assert_eq!(ids(&ranked), vec![2, 1, 3]);
        assert!(ranked[1].distance_km.is_none());
        assert!(ranked[2].distance_km.is_none());
    }

    #[test]
    fn test_rank_without_origin_keeps_input_order() {
        let ranked = rank(
            None,
            vec![
                restaurant(3, Some(coords("59.93", "30.31")), None),
                restaurant(1, Some(coords("55.76", "37.62")), None),
            ],
        );

        assert_eq!(ids(&ranked), vec![3, 1]);
        assert!(ranked.iter().all(|r| r.distance_km.is_none()));
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let same = coords("55.76", "37.62");
        let ranked = rank(
            Some(coords("55.75", "37.61")),
            vec![
                restaurant(5, Some(same), None),
                restaurant(4, Some(same), None),
            ],
        );

        assert_eq!(ids(&ranked), vec![5, 4]);
    }

    #[tokio::test]
    async fn test_rank_with_locates_missing_coordinates() {
        let ranked = rank_with(
            Some(coords("55.75", "37.61")),
            vec![
                restaurant(1, Some(coords("59.93", "30.31")), None),
                restaurant(2, None, Some("Moscow, Tverskaya 5")),
            ],
            |_| async { Ok::<_, String>(coords("55.76", "37.62")) },
        )
        .await;

        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!(ranked[0].distance_km.is_some());
        // Stored coordinates are not rewritten
        assert!(ranked[0].restaurant.coordinates.is_none());
    }

    #[tokio::test]
    async fn test_rank_with_failed_lookup_is_unknown() {
        let ranked = rank_with(
            Some(coords("55.75", "37.61")),
            vec![
                restaurant(1, None, Some("Nowhere street")),
                restaurant(2, Some(coords("59.93", "30.31")), None),
            ],
            |_| async { Err::<Coordinates, _>("geocoder down") },
        )
        .await;

        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!(ranked[1].distance_km.is_none());
    }

    /// Counts events at `WARN` or above.
    struct WarningCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarningCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() <= tracing::Level::WARN {
                self.0.fetch_add(1, AtomicOrdering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_rank_with_leaves_failure_reporting_to_locator() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(WarningCounter(Arc::clone(&warnings)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let ranked = rank_with(
            Some(coords("55.75", "37.61")),
            vec![restaurant(1, None, Some("Nowhere street"))],
            |_| async { Err::<Coordinates, _>("geocoder down") },
        )
        .await;

        assert!(ranked[0].distance_km.is_none());
        assert_eq!(warnings.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rank_with_skips_lookup_without_origin() {
        let mut calls = 0;
        let ranked = rank_with(
            None,
            vec![restaurant(1, None, Some("Moscow, Tverskaya 5"))],
            |_| {
                calls += 1;
                async { Ok::<_, String>(coords("55.76", "37.62")) }
            },
        )
        .await;

        assert_eq!(calls, 0);
        assert!(ranked[0].distance_km.is_none());
    }
}
