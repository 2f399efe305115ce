//! Tests for medoid selection

use stay_locator::medoid::distance_matrix;
use stay_locator::{cluster_medoid_indices, medoid_index, DistanceMetric, GpsPoint};

fn total_distance(points: &[GpsPoint], i: usize, metric: DistanceMetric) -> f64 {
    points.iter().map(|p| metric.distance(&points[i], p)).sum()
}

/// Points on a deterministic spiral with uneven spacing.
fn spiral(n: usize, seed: f64) -> Vec<GpsPoint> {
    (0..n)
        .map(|i| {
            let angle = (i as f64 * 2.399 + seed).rem_euclid(std::f64::consts::TAU);
            let radius = 0.001 * ((i * 7 + 3) % 11) as f64;
            GpsPoint::new(45.0 + radius * angle.sin(), 7.0 + radius * angle.cos())
        })
        .collect()
}

#[test]
fn test_medoid_minimises_total_distance() {
    for metric in [DistanceMetric::Planar, DistanceMetric::Haversine] {
        for n in 2..25 {
            let points = spiral(n, n as f64 * 0.37);
            let m = medoid_index(&points, metric).unwrap();
            let best = total_distance(&points, m, metric);
            for i in 0..n {
                let other = total_distance(&points, i, metric);
                assert!(
                    best <= other + 1e-9,
                    "{:?} n={}: medoid {} total {} > index {} total {}",
                    metric,
                    n,
                    m,
                    best,
                    i,
                    other
                );
            }
        }
    }
}

#[test]
fn test_distance_matrix_matches_metric() {
    let points = spiral(6, 1.0);
    let matrix = distance_matrix(&points, DistanceMetric::Haversine);
    for i in 0..points.len() {
        assert_eq!(matrix[i][i], 0.0);
        for j in 0..points.len() {
            assert_eq!(matrix[i][j], matrix[j][i]);
        }
    }
    let d = DistanceMetric::Haversine.distance(&points[1], &points[4]);
    assert_eq!(matrix[1][4], d);
}

#[test]
fn test_one_medoid_per_cluster() {
    let labelled = vec![
        (1, GpsPoint::new(0.0, 0.0)),
        (1, GpsPoint::new(0.0, 1.0)),
        (2, GpsPoint::new(5.0, 5.0)),
        (2, GpsPoint::new(5.0, 6.0)),
        (2, GpsPoint::new(5.0, 5.4)),
    ];
    let medoids = cluster_medoid_indices(&labelled);

    assert_eq!(medoids.len(), 2);
    // Two-member cluster: both totals equal, first index wins
    assert_eq!(medoids[0], 0);
    // (5.0, 5.4) sits between the other two members
    assert_eq!(medoids[1], 4);
}

#[test]
fn test_cluster_medoids_in_ascending_label_order() {
    let labelled = vec![
        (9, GpsPoint::new(1.0, 1.0)),
        (-1, GpsPoint::new(2.0, 2.0)),
        (4, GpsPoint::new(3.0, 3.0)),
        (-1, GpsPoint::new(2.0, 2.1)),
        (-1, GpsPoint::new(2.0, 2.05)),
    ];
    assert_eq!(cluster_medoid_indices(&labelled), vec![4, 2, 0]);
}

#[test]
fn test_empty_input() {
    assert_eq!(medoid_index(&[], DistanceMetric::Planar), None);
    assert!(cluster_medoid_indices(&[]).is_empty());
}
