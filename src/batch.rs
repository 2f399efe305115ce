//! # Batch Stay Extraction
//!
//! Runs stay-point extraction independently for every entity of a dataset
//! and concatenates the results.
//!
//! Entities share nothing but the read-only dataset. With the `parallel`
//! feature they are fanned out to a rayon pool of `parallelism` threads;
//! results are collected by entity position, so the output table is in
//! entity-key order no matter which worker finishes first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, StayError};
use crate::stays::{extract_stay_points, StayConfig};
use crate::{PositionSample, StayLocation};

// ============================================================================
// Dataset
// ============================================================================

/// One row of the raw sample table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub entity_id: String,
    /// Unix timestamp (seconds since epoch)
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw samples partitioned by entity, iterated in entity-key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    entities: BTreeMap<String, Vec<PositionSample>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group rows by entity. Rows keep their input order within an entity.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = SampleRow>,
    {
        let mut dataset = Self::new();
        for row in rows {
            dataset.push_row(row);
        }
        dataset
    }

    pub fn push_row(&mut self, row: SampleRow) {
        self.entities
            .entry(row.entity_id)
            .or_default()
            .push(PositionSample::new(row.timestamp, row.latitude, row.longitude));
    }

    /// Append samples to an entity's trace.
    pub fn insert(&mut self, entity_id: &str, samples: Vec<PositionSample>) {
        self.entities
            .entry(entity_id.to_string())
            .or_default()
            .extend(samples);
    }

    pub fn get(&self, entity_id: &str) -> Option<&[PositionSample]> {
        self.entities.get(entity_id).map(Vec::as_slice)
    }

    /// Entities in key order.
    pub fn entities(&self) -> impl Iterator<Item = (&str, &[PositionSample])> {
        self.entities
            .iter()
            .map(|(id, samples)| (id.as_str(), samples.as_slice()))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn sample_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<SampleRow> for Dataset {
    fn from_iter<I: IntoIterator<Item = SampleRow>>(iter: I) -> Self {
        Self::from_rows(iter)
    }
}

// ============================================================================
// Configuration and output
// ============================================================================

/// What to do when one entity's extraction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the batch with the first failing entity (in key order)
    #[default]
    FailFast,
    /// Leave the entity out of the table and report it in `failures`
    SkipAndReport,
}

/// Configuration for batch extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Per-entity stay extraction parameters
    pub stay: StayConfig,

    /// Number of entities processed concurrently.
    /// Default: 1
    pub parallelism: usize,

    /// Default: fail fast
    pub failure_policy: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            stay: StayConfig::default(),
            parallelism: 1,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        self.stay.validate()?;
        if self.parallelism == 0 {
            return Err(StayError::ConfigError {
                message: "parallelism must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// An entity left out of the stay table, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub entity_id: String,
    pub message: String,
}

/// Concatenated stay table plus the entities that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Stay locations of all entities, in entity-key order
    pub stays: Vec<StayLocation>,
    /// Entities skipped under `FailurePolicy::SkipAndReport`
    pub failures: Vec<EntityFailure>,
}

// ============================================================================
// Progress
// ============================================================================

/// Receives progress updates while a batch runs.
///
/// Called from worker threads. Implementations must be thread-safe.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any entity starts.
    fn on_start(&self, total: usize);
    /// Called after each entity completes (in completion order).
    fn on_entity_done(&self, completed: usize, total: usize);
}

/// No-op implementation.
pub struct NoopProgress;

impl BatchProgressCallback for NoopProgress {
    fn on_start(&self, _total: usize) {}
    fn on_entity_done(&self, _completed: usize, _total: usize) {}
}

/// Logs progress roughly every `total / 50` entities.
pub struct LogProgress;

impl BatchProgressCallback for LogProgress {
    fn on_start(&self, total: usize) {
        info!("[Batch] Extracting stays for {} entities", total);
    }

    fn on_entity_done(&self, completed: usize, total: usize) {
        let step = (total / 50).max(1);
        if completed % step == 0 || completed == total {
            info!("[Batch] Processed entity {} of {}", completed, total);
        }
    }
}

/// Atomic progress tracker that can be polled from another thread.
#[derive(Debug, Default)]
pub struct AtomicProgressTracker {
    pub completed: AtomicUsize,
    pub total: AtomicUsize,
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// (completed, total)
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.completed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

impl BatchProgressCallback for AtomicProgressTracker {
    fn on_start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
    }

    fn on_entity_done(&self, completed: usize, _total: usize) {
        self.completed.fetch_max(completed, Ordering::Relaxed);
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Extract stay locations for every entity of `dataset`.
///
/// See [`process_all_entities_with`] for progress reporting and
/// cancellation.
pub fn process_all_entities(dataset: &Dataset, config: &BatchConfig) -> Result<BatchOutput> {
    process_all_entities_with(dataset, config, &NoopProgress, None)
}

/// Extract stay locations for every entity, with progress and cancellation.
///
/// Each entity's samples are sorted by timestamp before extraction. The
/// cancel flag is checked before an entity starts; an entity that started
/// always finishes. If any entity was skipped because of cancellation the
/// whole batch is discarded with [`StayError::Cancelled`].
pub fn process_all_entities_with(
    dataset: &Dataset,
    config: &BatchConfig,
    progress: &dyn BatchProgressCallback,
    cancel: Option<&AtomicBool>,
) -> Result<BatchOutput> {
    config.validate()?;

    let start = Instant::now();
    let entities: Vec<(&str, &[PositionSample])> = dataset.entities().collect();
    let total = entities.len();
    let completed = AtomicUsize::new(0);

    progress.on_start(total);

    let run_entity = |&(entity_id, samples): &(&str, &[PositionSample])| {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return None;
        }
        let result = extract_stay_points(entity_id, samples, &config.stay, false);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        progress.on_entity_done(done, total);
        Some(result)
    };

    let results: Vec<Option<Result<Vec<StayLocation>>>> =
        run_indexed(&entities, config.parallelism, run_entity)?;

    if results.iter().any(Option::is_none) {
        let completed = completed.load(Ordering::Relaxed);
        warn!("[Batch] Cancelled after {} of {} entities", completed, total);
        return Err(StayError::Cancelled { completed, total });
    }

    let mut output = BatchOutput::default();
    for ((entity_id, _), result) in entities.iter().zip(results.into_iter().flatten()) {
        match result {
            Ok(stays) => output.stays.extend(stays),
            Err(err) => match config.failure_policy {
                FailurePolicy::FailFast => {
                    return Err(StayError::EntityFailed {
                        entity_id: entity_id.to_string(),
                        message: err.to_string(),
                    });
                }
                FailurePolicy::SkipAndReport => {
                    warn!("[Batch] Skipping entity {}: {}", entity_id, err);
                    output.failures.push(EntityFailure {
                        entity_id: entity_id.to_string(),
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    info!(
        "[Batch] {} entities ({} samples) -> {} stays, {} failures in {}ms",
        total,
        dataset.sample_count(),
        output.stays.len(),
        output.failures.len(),
        start.elapsed().as_millis()
    );

    Ok(output)
}

/// Map `f` over `items` on up to `parallelism` threads, keeping input order.
#[cfg(feature = "parallel")]
fn run_indexed<T, R, F>(items: &[T], parallelism: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallelism <= 1 || items.len() <= 1 {
        return Ok(items.iter().map(f).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .build()
        .map_err(|e| StayError::ThreadPool {
            message: e.to_string(),
        })?;

    debug!("[Batch] Using {} worker threads", parallelism);

    // Indexed parallel collect places each result at its input position
    Ok(pool.install(|| items.par_iter().map(f).collect()))
}

#[cfg(not(feature = "parallel"))]
fn run_indexed<T, R, F>(items: &[T], parallelism: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(&T) -> R,
{
    if parallelism > 1 {
        debug!("[Batch] Built without the parallel feature, running sequentially");
    }
    Ok(items.iter().map(f).collect())
}
