//! Destination extraction.
//!
//! Stay locations are labelled by a [`DestinationClusterer`]; each cluster
//! becomes one destination represented by its medoid stay location, with
//! the number of member stays as its visitation count.

use std::collections::{BTreeMap, HashMap};

use log::info;
use serde::{Deserialize, Serialize};

use crate::clustering::{DestinationClusterer, LinkageMethod};
use crate::error::{Result, StayError};
use crate::geo_utils::meters_to_degrees;
use crate::medoid::cluster_medoid_indices;
use crate::{Destination, GpsPoint, StayLocation, WeightedLocation};

/// Configuration for destination clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Linkage rule of the hierarchical clustering.
    /// Default: single
    pub linkage: LinkageMethod,

    /// Maximum linkage distance inside one destination, in degrees.
    /// Default: 100 m expressed in degrees (~0.0009)
    pub max_cluster_distance_degrees: f64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            linkage: LinkageMethod::Single,
            max_cluster_distance_degrees: meters_to_degrees(100.0),
        }
    }
}

impl DestinationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_cluster_distance_degrees.is_finite() && self.max_cluster_distance_degrees > 0.0)
        {
            return Err(StayError::ConfigError {
                message: format!(
                    "max_cluster_distance_degrees must be positive, got {}",
                    self.max_cluster_distance_degrees
                ),
            });
        }
        Ok(())
    }
}

/// A stay location tagged with its destination cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledStay {
    #[serde(flatten)]
    pub stay: StayLocation,
    pub cluster_assignment: i64,
}

/// Label every stay with a destination cluster.
///
/// Fails with [`StayError::CollaboratorContract`] if the clusterer does not
/// return exactly one label per stay.
pub fn label_stays(
    stays: &[StayLocation],
    clusterer: &dyn DestinationClusterer,
    config: &DestinationConfig,
) -> Result<Vec<LabelledStay>> {
    config.validate()?;

    let points: Vec<GpsPoint> = stays.iter().map(StayLocation::point).collect();
    let labels = clusterer.assign_clusters(
        &points,
        config.linkage,
        config.max_cluster_distance_degrees,
    )?;

    if labels.len() != stays.len() {
        return Err(StayError::CollaboratorContract {
            expected: stays.len(),
            actual: labels.len(),
        });
    }

    Ok(stays
        .iter()
        .zip(labels)
        .map(|(stay, cluster_assignment)| LabelledStay {
            stay: stay.clone(),
            cluster_assignment,
        })
        .collect())
}

/// One destination per cluster, in ascending cluster id order.
///
/// The destination is the cluster's medoid stay (degree-space distance)
/// and `count` is the number of stays in the cluster.
pub fn extract_destinations(labelled: &[LabelledStay]) -> Vec<Destination> {
    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
    for entry in labelled {
        *counts.entry(entry.cluster_assignment).or_insert(0) += 1;
    }

    let keyed: Vec<(i64, GpsPoint)> = labelled
        .iter()
        .map(|entry| (entry.cluster_assignment, entry.stay.point()))
        .collect();

    let destinations: Vec<Destination> = cluster_medoid_indices(&keyed)
        .into_iter()
        .map(|idx| {
            let medoid = &labelled[idx];
            Destination {
                location: medoid.stay.clone(),
                cluster_assignment: medoid.cluster_assignment,
                count: counts.get(&medoid.cluster_assignment).copied().unwrap_or(0),
            }
        })
        .collect();

    info!(
        "[Destinations] {} stays -> {} destinations",
        labelled.len(),
        destinations.len()
    );

    destinations
}

/// Destinations visited by each entity, weighted by that entity's visits.
///
/// Entities come out in key order, destinations per entity in ascending
/// cluster id order. Coordinates are those of the destination medoid.
pub fn entity_visits(
    labelled: &[LabelledStay],
    destinations: &[Destination],
) -> BTreeMap<String, Vec<WeightedLocation>> {
    let by_cluster: HashMap<i64, &Destination> = destinations
        .iter()
        .map(|d| (d.cluster_assignment, d))
        .collect();

    let mut visits: BTreeMap<String, BTreeMap<i64, u32>> = BTreeMap::new();
    for entry in labelled {
        *visits
            .entry(entry.stay.entity_id.clone())
            .or_default()
            .entry(entry.cluster_assignment)
            .or_insert(0) += 1;
    }

    visits
        .into_iter()
        .map(|(entity_id, clusters)| {
            let locations = clusters
                .into_iter()
                .filter_map(|(cluster, count)| {
                    by_cluster.get(&cluster).map(|d| {
                        WeightedLocation::new(d.location.longitude, d.location.latitude, count)
                    })
                })
                .collect();
            (entity_id, locations)
        })
        .collect()
}
