//! Persisted shape of a program.
//!
//! Relay assignments are stored as plain integers with `-1` standing for
//! "unassigned". The crc is derived and never part of the record.

use serde::{Deserialize, Serialize};

use super::Program;
use crate::error::ConfigurationError;
use crate::id::{ProgramId, SensorId};

/// Stored value of an unassigned relay slot.
pub const UNASSIGNED: i64 = -1;

/// One program as written to and read from the persistent store.
///
/// `id` is optional so a corrupt store can be represented and rejected at
/// load time instead of failing deep inside the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub sensor_id: String,
    pub heating_relay_index: i64,
    pub cooling_relay_index: i64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub active: bool,
}

impl From<Program> for ProgramRecord {
    fn from(program: Program) -> Self {
        Self {
            id: Some(program.id.to_string()),
            name: program.name,
            sensor_id: program.sensor_id.as_str().to_string(),
            heating_relay_index: encode_slot(program.heating_relay),
            cooling_relay_index: encode_slot(program.cooling_relay),
            min_temp: program.min_temperature,
            max_temp: program.max_temperature,
            active: program.active,
        }
    }
}

impl From<&Program> for ProgramRecord {
    fn from(program: &Program) -> Self {
        program.clone().into()
    }
}

impl TryFrom<ProgramRecord> for Program {
    type Error = ConfigurationError;

    fn try_from(record: ProgramRecord) -> Result<Self, Self::Error> {
        let raw_id = match record.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(ConfigurationError::MissingId {
                    sensor_id: record.sensor_id,
                });
            }
        };
        let id = raw_id
            .parse::<ProgramId>()
            .map_err(|_| ConfigurationError::InvalidId { id: raw_id.clone() })?;

        Ok(Self {
            id,
            name: record.name,
            sensor_id: SensorId::new(record.sensor_id),
            heating_relay: decode_slot(record.heating_relay_index)?,
            cooling_relay: decode_slot(record.cooling_relay_index)?,
            min_temperature: record.min_temp,
            max_temperature: record.max_temp,
            active: record.active,
        })
    }
}

pub(crate) fn encode_slot(slot: Option<usize>) -> i64 {
    slot.map_or(UNASSIGNED, |index| i64::try_from(index).unwrap_or(i64::MAX))
}

pub(crate) fn decode_slot(value: i64) -> Result<Option<usize>, ConfigurationError> {
    if value == UNASSIGNED {
        return Ok(None);
    }
    usize::try_from(value)
        .map(Some)
        .map_err(|_| ConfigurationError::InvalidRelayIndex { index: value })
}

/// Serde adapter mapping `Option<usize>` onto the `-1` sentinel encoding.
pub(crate) mod relay_slot {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        slot: &Option<usize>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::encode_slot(*slot))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<usize>, D::Error> {
        let value = i64::deserialize(deserializer)?;
        super::decode_slot(value).map_err(serde::de::Error::custom)
    }
}
