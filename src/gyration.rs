//! Radius of gyration.
//!
//! A mobility-range statistic: the visit-weighted root-mean-square distance
//! of a set of destinations from their centroid. The centroid is the plain
//! mean of the selected coordinates; visitation counts weight only the
//! final average. Computation happens in degree space and the result is
//! converted to meters.
//!
//! ## Example
//! ```rust
//! use stay_locator::{radius_of_gyration, WeightedLocation};
//!
//! let home = WeightedLocation::new(0.0, 0.0, 10);
//! assert_eq!(radius_of_gyration(&[home], Some(1), false), Some(0.0));
//! assert_eq!(radius_of_gyration(&[home], Some(2), false), None);
//! ```

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{compute_centroid, degrees_to_meters};
use crate::{GpsPoint, WeightedLocation};

/// Configuration for radius-of-gyration calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GyrationConfig {
    /// Only use the `k` most visited destinations. `None` uses all of them.
    pub k: Option<usize>,
    /// Weight every destination equally instead of by visitation count.
    pub ignore_weights: bool,
}

/// Radius of gyration in meters over the `k` most visited destinations.
///
/// Returns `None` when the statistic is undefined: `k == 0`, `k` larger
/// than the number of destinations, or no destinations at all. Ties in
/// visitation count keep the destinations' original order.
pub fn radius_of_gyration(
    destinations: &[WeightedLocation],
    k: Option<usize>,
    ignore_weights: bool,
) -> Option<f64> {
    let k = k.unwrap_or(destinations.len());
    if k == 0 || k > destinations.len() {
        return None;
    }

    // Stable sort, so equal counts stay in input order
    let mut selected: Vec<&WeightedLocation> = destinations.iter().collect();
    selected.sort_by(|a, b| b.count.cmp(&a.count));
    selected.truncate(k);

    let points: Vec<GpsPoint> = selected
        .iter()
        .map(|d| GpsPoint::new(d.latitude, d.longitude))
        .collect();
    let centroid = compute_centroid(&points);

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (location, point) in selected.iter().zip(&points) {
        let weight = if ignore_weights {
            1.0
        } else {
            location.count as f64
        };
        let dlng = point.longitude - centroid.longitude;
        let dlat = point.latitude - centroid.latitude;
        weighted_sum += weight * (dlng * dlng + dlat * dlat);
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return None;
    }

    Some(degrees_to_meters((weighted_sum / total_weight).sqrt()))
}

/// Radius of gyration of every entity's visited destinations.
pub fn radius_of_gyration_by_entity(
    visits: &BTreeMap<String, Vec<WeightedLocation>>,
    config: &GyrationConfig,
) -> BTreeMap<String, Option<f64>> {
    let radii: BTreeMap<String, Option<f64>> = visits
        .iter()
        .map(|(entity_id, locations)| {
            (
                entity_id.clone(),
                radius_of_gyration(locations, config.k, config.ignore_weights),
            )
        })
        .collect();

    debug!(
        "[Gyration] {} entities, {} undefined",
        radii.len(),
        radii.values().filter(|r| r.is_none()).count()
    );

    radii
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::METERS_PER_DEGREE;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_single_destination_is_zero() {
        let destinations = [WeightedLocation::new(0.0, 0.0, 10)];
        assert_eq!(radius_of_gyration(&destinations, Some(1), false), Some(0.0));
        assert_eq!(radius_of_gyration(&destinations, None, false), Some(0.0));
    }

    #[test]
    fn test_undefined_k() {
        let destinations = [
            WeightedLocation::new(0.0, 0.0, 1),
            WeightedLocation::new(1.0, 0.0, 1),
        ];
        assert_eq!(radius_of_gyration(&destinations, Some(0), false), None);
        assert_eq!(radius_of_gyration(&destinations, Some(3), false), None);
        assert_eq!(radius_of_gyration(&[], None, false), None);
    }

    #[test]
    fn test_weights_apply_after_unweighted_centroid() {
        // Centroid is (0.5, 0) regardless of weights
        let destinations = [
            WeightedLocation::new(0.0, 0.0, 3),
            WeightedLocation::new(1.0, 0.0, 1),
        ];
        let weighted = radius_of_gyration(&destinations, None, false).unwrap();
        let unweighted = radius_of_gyration(&destinations, None, true).unwrap();

        // Both points are 0.5 degrees from the centroid
        assert!(approx_eq(weighted, 0.5 * METERS_PER_DEGREE, 1e-6));
        assert!(approx_eq(unweighted, 0.5 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_top_k_selects_most_visited() {
        let destinations = [
            WeightedLocation::new(10.0, 0.0, 1),
            WeightedLocation::new(0.0, 0.0, 5),
            WeightedLocation::new(0.0, 2.0, 4),
        ];
        let r = radius_of_gyration(&destinations, Some(2), false).unwrap();
        // Centroid (0, 1); both selected points 1 degree away
        assert!(approx_eq(r, METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_top_k_ties_keep_input_order() {
        let destinations = [
            WeightedLocation::new(0.0, 0.0, 2),
            WeightedLocation::new(4.0, 0.0, 2),
            WeightedLocation::new(8.0, 0.0, 2),
        ];
        let r = radius_of_gyration(&destinations, Some(2), true).unwrap();
        assert!(approx_eq(r, 2.0 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_by_entity() {
        let mut visits = BTreeMap::new();
        visits.insert("a".to_string(), vec![WeightedLocation::new(0.0, 0.0, 2)]);
        visits.insert("b".to_string(), vec![]);
        let result = radius_of_gyration_by_entity(&visits, &GyrationConfig::default());
        assert_eq!(result["a"], Some(0.0));
        assert_eq!(result["b"], None);
    }
}
