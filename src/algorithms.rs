//! # Algorithm Toolbox
//!
//! Direct access to the standalone algorithms behind the pipeline. Use
//! these to run a single stage (stay extraction, medoid selection,
//! clustering, gyration) inside your own system without going through
//! [`analyze`](crate::analyze).
//!
//! ## Core Algorithms
//!
//! - **Stay Extraction**: Windowed stay-point detection per entity
//! - **Batch Extraction**: Per-entity fan-out over a bounded worker pool
//! - **Destination Clustering**: Hierarchical clustering of stay locations
//! - **Radius of Gyration**: Mobility range over visited destinations
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Planar Distance**: Euclidean distance in degree space
//! - **Medoid**: Member minimising total distance to the others
//!
//! # Example
//!
//! ```rust
//! use stay_locator::algorithms::{haversine_distance, medoid_index, DistanceMetric, GpsPoint};
//!
//! let london = GpsPoint::new(51.5074, -0.1278);
//! let paris = GpsPoint::new(48.8566, 2.3522);
//! println!("London to Paris: {:.0} km", haversine_distance(&london, &paris) / 1000.0);
//!
//! let trio = [london, paris, GpsPoint::new(50.0, 1.0)];
//! assert_eq!(medoid_index(&trio, DistanceMetric::Haversine), Some(2));
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Destination, GpsPoint, PositionSample, StayLocation, WeightedLocation};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    compute_centroid, degrees_to_meters, haversine_distance, max_distance_to,
    max_pairwise_distance, meters_to_degrees, planar_distance, DistanceMetric, METERS_PER_DEGREE,
};

// =============================================================================
// Medoid Selection
// =============================================================================

/// Full pairwise distance matrix
pub use crate::medoid::distance_matrix;

/// Index of the medoid of a point set.
///
/// The medoid minimises the summed distance to every other member. Ties go
/// to the lowest index.
pub use crate::medoid::medoid_index;

/// Global index of the medoid of every labelled cluster, ascending label.
pub use crate::medoid::cluster_medoid_indices;

// =============================================================================
// Stay Extraction
// =============================================================================

/// Configuration for stay extraction
pub use crate::stays::StayConfig;
/// Sample index range of one stay
pub use crate::stays::StayWindow;
/// Lazy iterator over stay windows of a sorted trace
pub use crate::stays::StayWindows;

/// Extract stay windows (index ranges plus medoid) from one trace.
pub use crate::stays::extract_stay_windows;

/// Extract stay locations from one entity's samples.
///
/// Algorithm:
/// 1. Find the first sample at least `min_stay_duration` after the start
/// 2. Accept the window if every pair of samples is within the roaming distance
/// 3. Grow the window while new samples stay within range of all members
/// 4. Emit the medoid sample with the window's start and end times
///
/// # Arguments
/// * `entity_id` - Owner written into every stay
/// * `samples` - Position samples (sorted when `is_sorted` is true)
/// * `config` - Duration and roaming thresholds
/// * `is_sorted` - Skip sorting; fails if the samples are not in time order
pub use crate::stays::extract_stay_points;

// =============================================================================
// Batch Extraction
// =============================================================================

pub use crate::batch::{
    BatchConfig, BatchOutput, BatchProgressCallback, Dataset, EntityFailure, FailurePolicy,
    SampleRow,
};

/// Stay extraction for every entity of a dataset, in entity-key order.
pub use crate::batch::process_all_entities;

/// Same as [`process_all_entities`] with a progress callback and an
/// optional cancel flag.
pub use crate::batch::process_all_entities_with;

// =============================================================================
// Destination Clustering
// =============================================================================

/// Union-Find over indices, labels in first-appearance order
pub use crate::union_find::UnionFind;

pub use crate::clustering::{AgglomerativeClusterer, DestinationClusterer, LinkageMethod};

pub use crate::destinations::{
    entity_visits, extract_destinations, label_stays, DestinationConfig, LabelledStay,
};

// =============================================================================
// Radius of Gyration
// =============================================================================

/// Radius of gyration over the `k` most visited destinations, in meters
pub use crate::gyration::radius_of_gyration;
/// Radius of gyration per entity
pub use crate::gyration::radius_of_gyration_by_entity;
pub use crate::gyration::GyrationConfig;
