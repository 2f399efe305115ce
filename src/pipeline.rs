//! End-to-end mobility analysis.
//!
//! raw samples -> per-entity stays -> destination labels -> destination
//! medoids with counts -> radius of gyration (population and per entity).

use std::collections::BTreeMap;
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::batch::{process_all_entities_with, BatchConfig, Dataset, EntityFailure, LogProgress};
use crate::clustering::DestinationClusterer;
use crate::destinations::{
    entity_visits, extract_destinations, label_stays, DestinationConfig, LabelledStay,
};
use crate::error::Result;
use crate::gyration::{radius_of_gyration, radius_of_gyration_by_entity, GyrationConfig};
use crate::{Destination, WeightedLocation};

/// All parameters of a mobility analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilityConfig {
    pub batch: BatchConfig,
    pub destinations: DestinationConfig,
    pub gyration: GyrationConfig,
}

impl MobilityConfig {
    pub fn validate(&self) -> Result<()> {
        self.batch.validate()?;
        self.destinations.validate()
    }
}

/// Output of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityReport {
    /// Every stay tagged with its destination cluster, in entity-key order
    pub stays: Vec<LabelledStay>,
    /// Entities skipped during extraction
    pub failures: Vec<EntityFailure>,
    /// One medoid per destination cluster, ascending cluster id
    pub destinations: Vec<Destination>,
    /// Radius of gyration over all destinations (meters)
    pub population_gyration: Option<f64>,
    /// Radius of gyration per entity over the destinations it visited
    pub entity_gyration: BTreeMap<String, Option<f64>>,
}

/// Run the full analysis over `dataset`.
pub fn analyze(
    dataset: &Dataset,
    config: &MobilityConfig,
    clusterer: &dyn DestinationClusterer,
) -> Result<MobilityReport> {
    config.validate()?;
    let start = Instant::now();

    let batch = process_all_entities_with(dataset, &config.batch, &LogProgress, None)?;
    let stays = label_stays(&batch.stays, clusterer, &config.destinations)?;
    let destinations = extract_destinations(&stays);

    let weighted: Vec<WeightedLocation> = destinations.iter().map(WeightedLocation::from).collect();
    let population_gyration =
        radius_of_gyration(&weighted, config.gyration.k, config.gyration.ignore_weights);

    let visits = entity_visits(&stays, &destinations);
    let entity_gyration = radius_of_gyration_by_entity(&visits, &config.gyration);

    info!(
        "[Pipeline] {} entities -> {} stays -> {} destinations in {}ms",
        dataset.entity_count(),
        stays.len(),
        destinations.len(),
        start.elapsed().as_millis()
    );

    Ok(MobilityReport {
        stays,
        failures: batch.failures,
        destinations,
        population_gyration,
        entity_gyration,
    })
}
