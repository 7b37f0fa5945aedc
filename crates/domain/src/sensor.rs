//! Sensor — an entry of the display-name catalogue.

use serde::{Deserialize, Serialize};

use crate::id::SensorId;

/// A temperature sensor and the name an operator gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    #[serde(default)]
    pub name: String,
}

impl Sensor {
    #[must_use]
    pub fn new(id: impl Into<SensorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// A sensor nobody has named yet.
    #[must_use]
    pub fn unnamed(id: impl Into<SensorId>) -> Self {
        Self::new(id, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_as_id_name_pair() {
        let sensor = Sensor::new("1001", "sensor_1");
        let json = serde_json::to_value(&sensor).unwrap();
        assert_eq!(json, serde_json::json!({"id": "1001", "name": "sensor_1"}));
    }

    #[test]
    fn should_default_name_to_empty_when_missing() {
        let sensor: Sensor = serde_json::from_str(r#"{"id":"1003"}"#).unwrap();
        assert_eq!(sensor, Sensor::unnamed("1003"));
    }
}
