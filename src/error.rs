//! Unified error handling for the stay-locator library.
//!
//! Degenerate inputs (no samples, a trace too short to ever satisfy the
//! minimum stay duration) are not errors: they produce empty results. The
//! variants below cover configuration mistakes, malformed samples and
//! violations of the contract with an external clusterer.

use std::fmt;

/// Unified error type for stay-locator operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StayError {
    /// A configuration parameter is out of range
    ConfigError { message: String },
    /// Samples were declared sorted but a timestamp goes backwards
    UnsortedInput { entity_id: String, index: usize },
    /// A sample has non-finite or out of range coordinates
    InvalidCoordinates {
        entity_id: String,
        index: usize,
        message: String,
    },
    /// The destination clusterer returned the wrong number of labels
    CollaboratorContract { expected: usize, actual: usize },
    /// Extraction failed for one entity of a batch
    EntityFailed { entity_id: String, message: String },
    /// The worker pool could not be created
    ThreadPool { message: String },
    /// The batch was cancelled before every entity completed
    Cancelled { completed: usize, total: usize },
    /// File input/output error (CLI)
    Io { message: String },
    /// JSON encoding or decoding error (CLI)
    Serialization { message: String },
}

impl fmt::Display for StayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            StayError::UnsortedInput { entity_id, index } => {
                write!(
                    f,
                    "Entity '{}' was declared sorted but sample {} is earlier than sample {}",
                    entity_id,
                    index,
                    index.saturating_sub(1)
                )
            }
            StayError::InvalidCoordinates {
                entity_id,
                index,
                message,
            } => {
                write!(
                    f,
                    "Entity '{}' sample {} has invalid coordinates: {}",
                    entity_id, index, message
                )
            }
            StayError::CollaboratorContract { expected, actual } => {
                write!(
                    f,
                    "Clusterer returned {} labels for {} points",
                    actual, expected
                )
            }
            StayError::EntityFailed { entity_id, message } => {
                write!(f, "Entity '{}' failed: {}", entity_id, message)
            }
            StayError::ThreadPool { message } => {
                write!(f, "Thread pool error: {}", message)
            }
            StayError::Cancelled { completed, total } => {
                write!(
                    f,
                    "Batch cancelled after {} of {} entities",
                    completed, total
                )
            }
            StayError::Io { message } => write!(f, "I/O error: {}", message),
            StayError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for StayError {}

impl From<std::io::Error> for StayError {
    fn from(err: std::io::Error) -> Self {
        StayError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StayError {
    fn from(err: serde_json::Error) -> Self {
        StayError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for stay-locator operations.
pub type Result<T> = std::result::Result<T, StayError>;
