//! Geographic utilities: unit conversion, distances and centroids.
//!
//! Unit conversion uses a spherical-earth approximation with a fixed
//! number of meters per degree. It ignores the latitude-dependent
//! shrinking of longitude degrees, which is acceptable at the scale of
//! human mobility analysis.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Meters per degree of latitude on the spherical approximation.
pub const METERS_PER_DEGREE: f64 = 111_319.9;

/// Convert a distance in meters to degrees.
///
/// # Example
/// ```
/// use stay_locator::geo_utils::meters_to_degrees;
/// assert!((meters_to_degrees(111_319.9) - 1.0).abs() < 1e-12);
/// ```
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Convert a distance in degrees to meters.
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}

/// Calculate haversine distance between two GPS points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Euclidean distance in (longitude, latitude) degree space.
pub fn planar_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    (p1.longitude - p2.longitude).hypot(p1.latitude - p2.latitude)
}

/// Distance metric used for pairwise computations.
///
/// Each algorithm uses one metric throughout a run: stay extraction works
/// in meters on the sphere, destination clustering works in degree space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Great-circle distance in meters
    Haversine,
    /// Euclidean distance in degrees
    Planar,
}

impl DistanceMetric {
    /// Distance between two points under this metric.
    pub fn distance(&self, p1: &GpsPoint, p2: &GpsPoint) -> f64 {
        match self {
            DistanceMetric::Haversine => haversine_distance(p1, p2),
            DistanceMetric::Planar => planar_distance(p1, p2),
        }
    }
}

/// Largest pairwise distance among `points` (0.0 for fewer than 2 points).
pub fn max_pairwise_distance(points: &[GpsPoint], metric: DistanceMetric) -> f64 {
    let mut max_distance: f64 = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max_distance = max_distance.max(metric.distance(a, b));
        }
    }
    max_distance
}

/// Largest distance from `point` to any of `others` (0.0 if empty).
pub fn max_distance_to(point: &GpsPoint, others: &[GpsPoint], metric: DistanceMetric) -> f64 {
    others
        .iter()
        .map(|other| metric.distance(point, other))
        .fold(0.0, f64::max)
}

/// Unweighted arithmetic mean of the points' coordinates.
///
/// Returns (0, 0) for an empty slice.
pub fn compute_centroid(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    GpsPoint::new(sum_lat / n, sum_lng / n)
}
