//! Sensor read failures and the diagnostic faults recorded from them.
//!
//! A [`SensorError`] is what a temperature source returns. A [`Fault`] is the
//! non-propagating record a zone monitor keeps of the last one, so operators
//! can see why a program stopped driving its relays.

use serde::{Deserialize, Serialize};

use crate::id::SensorId;
use crate::time::{Timestamp, now};

/// Failure to read a temperature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The sensor is not (or no longer) reported by the bus.
    #[error("sensor {0} not found")]
    NotFound(SensorId),

    /// The sensor exists but has no valid conversion yet. Transient.
    #[error("sensor {0} not ready")]
    NotReady(SensorId),
}

impl SensorError {
    #[must_use]
    pub fn kind(&self) -> SensorFault {
        match self {
            Self::NotFound(_) => SensorFault::NotFound,
            Self::NotReady(_) => SensorFault::NotReady,
        }
    }
}

/// Kind of a recorded sensor fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFault {
    NotFound,
    NotReady,
}

impl std::fmt::Display for SensorFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not_found"),
            Self::NotReady => f.write_str("not_ready"),
        }
    }
}

/// The last sensor fault seen by a program's monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: SensorFault,
    /// First observation of this kind in the current unbroken run.
    pub since: Timestamp,
}

impl Fault {
    #[must_use]
    pub fn new(kind: SensorFault) -> Self {
        Self { kind, since: now() }
    }

    /// Fold a new observation into the previous fault, keeping `since` when
    /// the kind did not change.
    #[must_use]
    pub fn observe(previous: Option<Self>, kind: SensorFault) -> Self {
        match previous {
            Some(fault) if fault.kind == kind => fault,
            _ => Self::new(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_error_to_fault_kind() {
        let id = SensorId::new("s1");
        assert_eq!(SensorError::NotFound(id.clone()).kind(), SensorFault::NotFound);
        assert_eq!(SensorError::NotReady(id).kind(), SensorFault::NotReady);
    }

    #[test]
    fn should_keep_since_when_same_kind_repeats() {
        let first = Fault::new(SensorFault::NotReady);
        let again = Fault::observe(Some(first), SensorFault::NotReady);
        assert_eq!(again.since, first.since);
    }

    #[test]
    fn should_restart_since_when_kind_changes() {
        let first = Fault::new(SensorFault::NotReady);
        let changed = Fault::observe(Some(first), SensorFault::NotFound);
        assert_eq!(changed.kind, SensorFault::NotFound);
        assert!(changed.since >= first.since);
    }

    #[test]
    fn should_display_kind_in_snake_case() {
        assert_eq!(SensorFault::NotReady.to_string(), "not_ready");
        let json = serde_json::to_string(&SensorFault::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
