//! Common error types used across the workspace.
//!
//! Each concern has its own typed error; [`BreweryError`] folds them together
//! through `#[from]` so every layer can propagate with `?`.

use crate::id::SensorId;

/// Top-level error returned by registry operations and ports.
#[derive(Debug, thiserror::Error)]
pub enum BreweryError {
    /// The candidate program was rejected. The caller must fix its input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced program or sensor does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A stored record is malformed. Fatal at load time.
    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    /// The persistent store failed to load or write.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reasons a candidate program is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("sensor {sensor_id} is already used by another program")]
    DuplicateSensor { sensor_id: SensorId },

    #[error("cooling relay {index} is already used by another program")]
    DuplicateCoolingRelay { index: usize },

    #[error("heating relay {index} is already used by another program")]
    DuplicateHeatingRelay { index: usize },

    #[error("sensor {sensor_id} is not reported by the temperature source")]
    UnknownSensor { sensor_id: SensorId },

    #[error("relay index {index} is out of range (relay count {relay_count})")]
    RelayOutOfRange { index: usize, relay_count: usize },
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A persisted record could not be turned into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("stored program for sensor {sensor_id} has no id")]
    MissingId { sensor_id: String },

    #[error("stored program id {id:?} is not a valid identifier")]
    InvalidId { id: String },

    #[error("stored relay index {index} is invalid, only -1 may be negative")]
    InvalidRelayIndex { index: i64 },

    #[error("stored program {id} is inconsistent with the rest of the store")]
    Rejected {
        id: String,
        #[source]
        source: ValidationError,
    },
}
