//! Program — one temperature zone: a sensor, up to two relays and a band.
//!
//! A program is an immutable value. The registry replaces it wholesale on
//! modification, so the [`crc`](Program::crc) computed from its fields is a
//! trustworthy staleness marker for clients.

mod record;

pub use record::{ProgramRecord, UNASSIGNED};

use serde::{Deserialize, Serialize};

use crate::id::{ProgramId, SensorId};

/// A temperature program as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ProgramRecord", try_from = "ProgramRecord")]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub sensor_id: SensorId,
    /// `None` means no heating relay is assigned.
    pub heating_relay: Option<usize>,
    /// `None` means no cooling relay is assigned.
    pub cooling_relay: Option<usize>,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub active: bool,
}

/// Everything a program holds except its id: the candidate handed to
/// `create` and `modify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDraft {
    #[serde(default)]
    pub name: String,
    pub sensor_id: SensorId,
    #[serde(rename = "heating_relay_index", with = "record::relay_slot")]
    pub heating_relay: Option<usize>,
    #[serde(rename = "cooling_relay_index", with = "record::relay_slot")]
    pub cooling_relay: Option<usize>,
    #[serde(rename = "min_temp")]
    pub min_temperature: f64,
    #[serde(rename = "max_temp")]
    pub max_temperature: f64,
    pub active: bool,
}

impl Program {
    /// Create a builder for constructing a [`Program`].
    #[must_use]
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Attach an id to a draft.
    #[must_use]
    pub fn from_draft(id: ProgramId, draft: ProgramDraft) -> Self {
        Self {
            id,
            name: draft.name,
            sensor_id: draft.sensor_id,
            heating_relay: draft.heating_relay,
            cooling_relay: draft.cooling_relay,
            min_temperature: draft.min_temperature,
            max_temperature: draft.max_temperature,
            active: draft.active,
        }
    }

    /// Strip the id, e.g. to submit a modified copy.
    #[must_use]
    pub fn to_draft(&self) -> ProgramDraft {
        ProgramDraft {
            name: self.name.clone(),
            sensor_id: self.sensor_id.clone(),
            heating_relay: self.heating_relay,
            cooling_relay: self.cooling_relay,
            min_temperature: self.min_temperature,
            max_temperature: self.max_temperature,
            active: self.active,
        }
    }

    /// Exit threshold of both hysteresis directions.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min_temperature + self.max_temperature) / 2.0
    }

    /// Whether `index` is this program's heating or cooling relay.
    #[must_use]
    pub fn claims_relay(&self, index: usize) -> bool {
        self.heating_relay == Some(index) || self.cooling_relay == Some(index)
    }

    /// Relay indices this program drives, heating first.
    pub fn assigned_relays(&self) -> impl Iterator<Item = usize> {
        self.heating_relay.into_iter().chain(self.cooling_relay)
    }

    /// Reproducible fingerprint of every field, id and name included.
    ///
    /// Rendered as eight lowercase hex digits. Derived on demand, never stored.
    #[must_use]
    pub fn crc(&self) -> String {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.id.as_uuid().as_bytes());
        hasher.update(self.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.sensor_id.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&record::encode_slot(self.heating_relay).to_le_bytes());
        hasher.update(&record::encode_slot(self.cooling_relay).to_le_bytes());
        hasher.update(&self.min_temperature.to_bits().to_le_bytes());
        hasher.update(&self.max_temperature.to_bits().to_le_bytes());
        hasher.update(&[u8::from(self.active)]);
        format!("{:08x}", hasher.finalize())
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "program {} ({:?}) sensor={} heating={} cooling={} min={} max={} active={}",
            self.id,
            self.name,
            self.sensor_id,
            record::encode_slot(self.heating_relay),
            record::encode_slot(self.cooling_relay),
            self.min_temperature,
            self.max_temperature,
            self.active,
        )
    }
}

/// Step-by-step builder for [`Program`] and [`ProgramDraft`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    id: Option<ProgramId>,
    name: Option<String>,
    sensor_id: Option<SensorId>,
    heating_relay: Option<usize>,
    cooling_relay: Option<usize>,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    active: Option<bool>,
}

impl ProgramBuilder {
    #[must_use]
    pub fn id(mut self, id: ProgramId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: impl Into<SensorId>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    #[must_use]
    pub fn heating_relay(mut self, index: usize) -> Self {
        self.heating_relay = Some(index);
        self
    }

    #[must_use]
    pub fn cooling_relay(mut self, index: usize) -> Self {
        self.cooling_relay = Some(index);
        self
    }

    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_temperature = Some(min);
        self.max_temperature = Some(max);
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Consume the builder into a candidate without an id.
    ///
    /// Unset relays stay unassigned, the band defaults to `0.0..=0.0` and the
    /// program defaults to active.
    #[must_use]
    pub fn draft(self) -> ProgramDraft {
        ProgramDraft {
            name: self.name.unwrap_or_default(),
            sensor_id: self.sensor_id.unwrap_or_else(|| SensorId::new("")),
            heating_relay: self.heating_relay,
            cooling_relay: self.cooling_relay,
            min_temperature: self.min_temperature.unwrap_or_default(),
            max_temperature: self.max_temperature.unwrap_or_default(),
            active: self.active.unwrap_or(true),
        }
    }

    /// Consume the builder into a [`Program`], generating an id if none was set.
    #[must_use]
    pub fn build(mut self) -> Program {
        let id = self.id.take().unwrap_or_default();
        Program::from_draft(id, self.draft())
    }
}
