//! # Stay Locator
//!
//! Stay-point extraction and destination analysis for raw GPS traces.
//!
//! This library provides:
//! - Stay-point ("stop location") extraction from one entity's samples
//! - Batch extraction over many entities with a bounded worker pool
//! - Medoid selection for point sets and labelled clusters
//! - Destination clustering across entities (pluggable clusterer)
//! - Radius of gyration over visited destinations
//!
//! ## Features
//!
//! - **`parallel`** - Bounded rayon worker pool for batch extraction (default)
//! - **`cli`** - Build the `stay-locator` command line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use stay_locator::{extract_stay_points, PositionSample, StayConfig};
//!
//! // Three samples at the same spot over twelve minutes
//! let samples = vec![
//!     PositionSample::new(0, 51.5074, -0.1278),
//!     PositionSample::new(300, 51.5074, -0.1278),
//!     PositionSample::new(720, 51.5074, -0.1278),
//! ];
//!
//! let config = StayConfig {
//!     min_stay_duration_minutes: 10.0,
//!     roaming_distance_meters: 50.0,
//! };
//!
//! let stays = extract_stay_points("user-1", &samples, &config, false).unwrap();
//! assert_eq!(stays.len(), 1);
//! assert_eq!(stays[0].t_start, 0);
//! assert_eq!(stays[0].t_end, 720);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, StayError};

// Geographic utilities (unit conversion, distances, centroids)
pub mod geo_utils;
pub use geo_utils::{degrees_to_meters, meters_to_degrees, DistanceMetric, METERS_PER_DEGREE};

// Medoid selection for point sets and labelled clusters
pub mod medoid;
pub use medoid::{cluster_medoid_indices, medoid_index};

// Stay-point extraction for a single entity
pub mod stays;
pub use stays::{extract_stay_points, extract_stay_windows, StayConfig, StayWindow, StayWindows};

// Batch extraction over many entities
pub mod batch;
pub use batch::{
    process_all_entities, process_all_entities_with, AtomicProgressTracker, BatchConfig,
    BatchOutput, BatchProgressCallback, Dataset, EntityFailure, FailurePolicy, LogProgress,
    NoopProgress, SampleRow,
};

// Union-Find data structure for single-linkage clustering
pub mod union_find;
pub use union_find::UnionFind;

// Destination clusterer contract and reference implementation
pub mod clustering;
pub use clustering::{AgglomerativeClusterer, DestinationClusterer, LinkageMethod};

// Destination extraction (cluster medoids and visitation counts)
pub mod destinations;
pub use destinations::{
    entity_visits, extract_destinations, label_stays, DestinationConfig, LabelledStay,
};

// Radius of gyration
pub mod gyration;
pub use gyration::{radius_of_gyration, radius_of_gyration_by_entity, GyrationConfig};

// End-to-end pipeline
pub mod pipeline;
pub use pipeline::{analyze, MobilityConfig, MobilityReport};

// Algorithm toolbox - flat access to all standalone algorithms
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One raw position fix of a moving entity.
///
/// # Example
/// ```
/// use stay_locator::PositionSample;
/// let sample = PositionSample::new(1_700_000_000, 51.5074, -0.1278);
/// assert_eq!(sample.point().latitude, 51.5074);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Unix timestamp (seconds since epoch)
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl PositionSample {
    /// Create a new sample. Coordinates are in degrees.
    pub fn new(timestamp: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
        }
    }

    /// The sample's coordinates as a GPS point.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A place where an entity stayed.
///
/// `timestamp`, `latitude` and `longitude` are those of the medoid sample of
/// the stay window; `t_start` and `t_end` are the timestamps of the first
/// and last sample in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayLocation {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub t_start: i64,
    pub t_end: i64,
    pub entity_id: String,
}

impl StayLocation {
    /// The stay's medoid coordinates as a GPS point.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Length of the stay in seconds.
    pub fn duration_secs(&self) -> i64 {
        self.t_end - self.t_start
    }
}

/// A destination: the medoid stay location of a cluster of stays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// The medoid stay location of the cluster
    #[serde(flatten)]
    pub location: StayLocation,
    /// Cluster label assigned by the destination clusterer
    pub cluster_assignment: i64,
    /// Number of stay locations in the cluster
    pub count: u32,
}

/// A visited location weighted by how often it was visited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedLocation {
    pub longitude: f64,
    pub latitude: f64,
    /// Visitation count (at least 1)
    pub count: u32,
}

impl WeightedLocation {
    /// Create a weighted location.
    pub fn new(longitude: f64, latitude: f64, count: u32) -> Self {
        Self {
            longitude,
            latitude,
            count,
        }
    }
}

impl From<&Destination> for WeightedLocation {
    fn from(destination: &Destination) -> Self {
        Self {
            longitude: destination.location.longitude,
            latitude: destination.location.latitude,
            count: destination.count,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
