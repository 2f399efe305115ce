//! Medoid selection.
//!
//! The medoid is the member of a point set with minimum total distance to
//! all other members. Unlike a centroid it is always a real sample.
//! Ties go to the lowest index.

use std::collections::BTreeMap;

use crate::geo_utils::DistanceMetric;
use crate::GpsPoint;

/// Full symmetric pairwise distance matrix.
pub fn distance_matrix(points: &[GpsPoint], metric: DistanceMetric) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(&points[i], &points[j]);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }
    matrix
}

/// Index of the medoid of `points`.
///
/// Returns `None` for an empty slice and `Some(0)` for a single point.
///
/// # Example
/// ```
/// use stay_locator::{medoid_index, DistanceMetric, GpsPoint};
///
/// let points = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 1.0),
///     GpsPoint::new(0.0, 5.0),
/// ];
/// assert_eq!(medoid_index(&points, DistanceMetric::Planar), Some(1));
/// ```
pub fn medoid_index(points: &[GpsPoint], metric: DistanceMetric) -> Option<usize> {
    match points.len() {
        0 => None,
        1 => Some(0),
        _ => {
            let matrix = distance_matrix(points, metric);
            let mut best_idx = 0;
            let mut best_total = f64::INFINITY;

            for (i, row) in matrix.iter().enumerate() {
                let total: f64 = row.iter().sum();
                // Strict comparison keeps the first minimum
                if total < best_total {
                    best_total = total;
                    best_idx = i;
                }
            }

            Some(best_idx)
        }
    }
}

/// Global index of the medoid of every cluster.
///
/// `labelled` holds `(cluster_id, point)` pairs. Clusters are visited in
/// ascending id order and the medoid of each is computed in degree space
/// (planar metric) over its members only. Returns one index into
/// `labelled` per distinct cluster id.
pub fn cluster_medoid_indices(labelled: &[(i64, GpsPoint)]) -> Vec<usize> {
    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, (cluster_id, _)) in labelled.iter().enumerate() {
        members.entry(*cluster_id).or_default().push(idx);
    }

    members
        .values()
        .filter_map(|indices| {
            let points: Vec<GpsPoint> = indices.iter().map(|&i| labelled[i].1).collect();
            medoid_index(&points, DistanceMetric::Planar).map(|local| indices[local])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single() {
        assert_eq!(medoid_index(&[], DistanceMetric::Planar), None);
        assert_eq!(
            medoid_index(&[GpsPoint::new(1.0, 1.0)], DistanceMetric::Planar),
            Some(0)
        );
    }

    #[test]
    fn test_tie_goes_to_first() {
        // Two points are always equidistant from each other
        let points = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
        assert_eq!(medoid_index(&points, DistanceMetric::Planar), Some(0));

        // Square corners all have the same total distance
        let square = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(1.0, 1.0),
            GpsPoint::new(1.0, 0.0),
        ];
        assert_eq!(medoid_index(&square, DistanceMetric::Planar), Some(0));
    }

    #[test]
    fn test_center_point_wins() {
        let points = vec![
            GpsPoint::new(0.0, -1.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(1.0, 0.0),
            GpsPoint::new(-1.0, 0.0),
        ];
        assert_eq!(medoid_index(&points, DistanceMetric::Planar), Some(2));
        assert_eq!(medoid_index(&points, DistanceMetric::Haversine), Some(2));
    }

    #[test]
    fn test_distance_matrix_symmetric() {
        let points = vec![
            GpsPoint::new(51.50, -0.12),
            GpsPoint::new(51.51, -0.13),
            GpsPoint::new(51.52, -0.11),
        ];
        let matrix = distance_matrix(&points, DistanceMetric::Haversine);
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(matrix[i][j], matrix[j][i]);
            }
        }
    }

    #[test]
    fn test_cluster_medoids_map_back_to_global_index() {
        let labelled = vec![
            (2, GpsPoint::new(10.0, 10.0)),
            (1, GpsPoint::new(0.0, 0.0)),
            (2, GpsPoint::new(10.0, 11.0)),
            (1, GpsPoint::new(0.0, 1.0)),
            (2, GpsPoint::new(10.0, 12.0)),
            (1, GpsPoint::new(0.0, 2.0)),
        ];
        // Cluster 1 first (ascending id), middle member of each cluster
        assert_eq!(cluster_medoid_indices(&labelled), vec![3, 2]);
        assert!(cluster_medoid_indices(&[]).is_empty());
    }
}
