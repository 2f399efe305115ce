//! # Stay-Point Extraction
//!
//! Finds the places where an entity stayed for at least a minimum duration
//! while never roaming further than a maximum distance.
//!
//! ## Algorithm
//! A single pass over the time-ordered samples with a window `[start, end]`
//! driven by a three-state machine:
//! 1. **Seeking** - find the first sample at least `min_stay_duration` after
//!    `start`. If there is none the tail can never qualify and the scan ends.
//!    If the samples up to it spread further than `roaming_distance` (any
//!    pair, not just from the centre), drop `start` and seek from the next
//!    sample.
//! 2. **Expanding** - greedily append following samples while each new
//!    sample is within `roaming_distance` of every sample already in the
//!    window.
//! 3. **Emitting** - pick the window's medoid (the first sample for a two
//!    sample window), emit it and continue seeking after the window.
//!
//! Windows never overlap and their start indices strictly increase.
//! All distances are haversine meters.

use std::borrow::Cow;
use std::ops::RangeInclusive;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StayError};
use crate::geo_utils::{max_distance_to, max_pairwise_distance, DistanceMetric};
use crate::medoid::medoid_index;
use crate::{GpsPoint, PositionSample, StayLocation};

/// Metric used for every distance in stay extraction.
const STAY_METRIC: DistanceMetric = DistanceMetric::Haversine;

/// Configuration for stay-point extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StayConfig {
    /// Minimum time span a stay must cover, in minutes.
    /// Default: 10.0
    pub min_stay_duration_minutes: f64,

    /// Maximum distance between any two samples of a stay, in meters.
    /// Default: 50.0
    pub roaming_distance_meters: f64,
}

impl Default for StayConfig {
    fn default() -> Self {
        Self {
            min_stay_duration_minutes: 10.0,
            roaming_distance_meters: 50.0,
        }
    }
}

impl StayConfig {
    /// Check that both thresholds are positive and finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_stay_duration_minutes.is_finite() && self.min_stay_duration_minutes > 0.0) {
            return Err(StayError::ConfigError {
                message: format!(
                    "min_stay_duration_minutes must be positive, got {}",
                    self.min_stay_duration_minutes
                ),
            });
        }
        if !(self.roaming_distance_meters.is_finite() && self.roaming_distance_meters > 0.0) {
            return Err(StayError::ConfigError {
                message: format!(
                    "roaming_distance_meters must be positive, got {}",
                    self.roaming_distance_meters
                ),
            });
        }
        Ok(())
    }

    /// Minimum stay duration in seconds.
    pub fn min_stay_duration_secs(&self) -> f64 {
        self.min_stay_duration_minutes * 60.0
    }
}

/// Sample index range consumed by one stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayWindow {
    /// First sample of the window
    pub start: usize,
    /// Last sample of the window (inclusive)
    pub end: usize,
    /// Medoid sample, `start <= medoid <= end`
    pub medoid: usize,
}

impl StayWindow {
    /// Sample indices covered by the window.
    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Number of samples in the window, at least two.
    pub fn sample_count(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Seeking { start: usize },
    Expanding { start: usize, end: usize },
    Emitting { start: usize, end: usize },
    Done,
}

/// Iterator over the stay windows of a time-sorted sample slice.
///
/// The samples must already be sorted by timestamp and the config valid;
/// use [`extract_stay_windows`] for a checked entry point.
#[derive(Debug, Clone)]
pub struct StayWindows<'a> {
    samples: &'a [PositionSample],
    points: Vec<GpsPoint>,
    min_duration_secs: f64,
    roaming_distance: f64,
    state: ScanState,
}

impl<'a> StayWindows<'a> {
    /// Start a scan over `samples` (sorted ascending by timestamp).
    pub fn new(samples: &'a [PositionSample], config: &StayConfig) -> Self {
        Self {
            samples,
            points: samples.iter().map(PositionSample::point).collect(),
            min_duration_secs: config.min_stay_duration_secs(),
            roaming_distance: config.roaming_distance_meters,
            state: ScanState::Seeking { start: 0 },
        }
    }

    /// First index at or after `start` whose timestamp is at least the
    /// minimum duration after `start`, if any.
    fn duration_cutoff(&self, start: usize) -> Option<usize> {
        let t0 = self.samples[start].timestamp;
        let offset = self.samples[start..].partition_point(|s| {
            (s.timestamp.saturating_sub(t0) as f64) < self.min_duration_secs
        });
        let cutoff = start + offset;
        (cutoff < self.samples.len()).then_some(cutoff)
    }

    fn seek(&self, start: usize) -> ScanState {
        if start >= self.samples.len() {
            return ScanState::Done;
        }
        let Some(cutoff) = self.duration_cutoff(start) else {
            return ScanState::Done;
        };
        if max_pairwise_distance(&self.points[start..=cutoff], STAY_METRIC) > self.roaming_distance {
            ScanState::Seeking { start: start + 1 }
        } else {
            ScanState::Expanding { start, end: cutoff }
        }
    }

    fn expand(&self, start: usize, mut end: usize) -> ScanState {
        // A new sample only needs checking against the samples already in
        // the window; earlier pairs are within range.
        while end + 1 < self.points.len() {
            let candidate = &self.points[end + 1];
            if max_distance_to(candidate, &self.points[start..=end], STAY_METRIC)
                > self.roaming_distance
            {
                break;
            }
            end += 1;
        }
        ScanState::Emitting { start, end }
    }

    fn medoid(&self, start: usize, end: usize) -> usize {
        if end - start == 1 {
            return start;
        }
        start + medoid_index(&self.points[start..=end], STAY_METRIC).unwrap_or(0)
    }
}

impl Iterator for StayWindows<'_> {
    type Item = StayWindow;

    fn next(&mut self) -> Option<StayWindow> {
        loop {
            match self.state {
                ScanState::Seeking { start } => self.state = self.seek(start),
                ScanState::Expanding { start, end } => self.state = self.expand(start, end),
                ScanState::Emitting { start, end } => {
                    let medoid = self.medoid(start, end);
                    self.state = ScanState::Seeking { start: end + 1 };
                    return Some(StayWindow { start, end, medoid });
                }
                ScanState::Done => return None,
            }
        }
    }
}

/// Reject samples with unusable coordinates.
fn validate_samples(entity_id: &str, samples: &[PositionSample]) -> Result<()> {
    for (index, sample) in samples.iter().enumerate() {
        if !sample.point().is_valid() {
            return Err(StayError::InvalidCoordinates {
                entity_id: entity_id.to_string(),
                index,
                message: format!(
                    "latitude {} longitude {}",
                    sample.latitude, sample.longitude
                ),
            });
        }
    }
    Ok(())
}

/// Index of the first sample whose timestamp is earlier than its predecessor.
fn first_unsorted(samples: &[PositionSample]) -> Option<usize> {
    samples
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
        .map(|i| i + 1)
}

/// Stay windows of a time-sorted trace, as sample index ranges.
///
/// Fails if the config is invalid, a sample has invalid coordinates or the
/// samples are not sorted by timestamp.
pub fn extract_stay_windows(
    entity_id: &str,
    samples: &[PositionSample],
    config: &StayConfig,
) -> Result<Vec<StayWindow>> {
    config.validate()?;
    validate_samples(entity_id, samples)?;
    if let Some(index) = first_unsorted(samples) {
        return Err(StayError::UnsortedInput {
            entity_id: entity_id.to_string(),
            index,
        });
    }
    Ok(StayWindows::new(samples, config).collect())
}

/// Extract the stay locations of one entity.
///
/// When `is_sorted` is false the samples are sorted by timestamp first.
/// When it is true the order is verified and an unsorted trace is an error.
/// Empty or too-short traces yield an empty result. Records are tagged
/// with `entity_id`, deduplicated and ordered by `t_start`.
pub fn extract_stay_points(
    entity_id: &str,
    samples: &[PositionSample],
    config: &StayConfig,
    is_sorted: bool,
) -> Result<Vec<StayLocation>> {
    config.validate()?;
    validate_samples(entity_id, samples)?;

    let sorted: Cow<[PositionSample]> = if is_sorted {
        if let Some(index) = first_unsorted(samples) {
            return Err(StayError::UnsortedInput {
                entity_id: entity_id.to_string(),
                index,
            });
        }
        Cow::Borrowed(samples)
    } else {
        let mut owned = samples.to_vec();
        owned.sort_by_key(|s| s.timestamp);
        Cow::Owned(owned)
    };

    let mut stays: Vec<StayLocation> = StayWindows::new(&sorted, config)
        .map(|window| {
            let medoid = &sorted[window.medoid];
            StayLocation {
                timestamp: medoid.timestamp,
                latitude: medoid.latitude,
                longitude: medoid.longitude,
                t_start: sorted[window.start].timestamp,
                t_end: sorted[window.end].timestamp,
                entity_id: entity_id.to_string(),
            }
        })
        .collect();

    stays.sort_by(|a, b| {
        a.t_start
            .cmp(&b.t_start)
            .then(a.t_end.cmp(&b.t_end))
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.latitude.total_cmp(&b.latitude))
            .then(a.longitude.total_cmp(&b.longitude))
    });
    stays.dedup();

    debug!(
        "[Stays] Entity {}: {} samples -> {} stays",
        entity_id,
        samples.len(),
        stays.len()
    );

    Ok(stays)
}

// ============================================================================
// Tests
// ============================================================================
