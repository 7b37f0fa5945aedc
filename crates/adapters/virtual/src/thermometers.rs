//! Simulated 1-wire thermometers.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use brewery_app::ports::TemperatureSource;
use brewery_domain::fault::SensorError;
use brewery_domain::id::SensorId;

/// Sensor ids present on a default virtual bus.
pub const FAKE_SENSORS: [&str; 4] = [
    "fake_sensor_1",
    "fake_sensor_2",
    "fake_sensor_3",
    "fake_sensor_4",
];

const INITIAL_TEMPERATURE: f64 = 18.0;

#[derive(Debug, Clone, Copy)]
enum Reading {
    Celsius(f64),
    NotReady,
}

/// In-memory thermometer bus. Sensors are listed in insertion order.
pub struct VirtualThermometers {
    readings: Mutex<Vec<(SensorId, Reading)>>,
}

impl Default for VirtualThermometers {
    fn default() -> Self {
        Self::with_sensors(&FAKE_SENSORS, INITIAL_TEMPERATURE)
    }
}

impl VirtualThermometers {
    /// A bus with the given sensors, all reading `celsius`.
    #[must_use]
    pub fn with_sensors(ids: &[&str], celsius: f64) -> Self {
        let readings = ids
            .iter()
            .map(|id| (SensorId::new(*id), Reading::Celsius(celsius)))
            .collect();
        Self {
            readings: Mutex::new(readings),
        }
    }

    /// Set a sensor's reading, plugging it in if absent.
    pub fn set_temperature(&self, id: &SensorId, celsius: f64) {
        self.put(id, Reading::Celsius(celsius));
    }

    /// Make a sensor report that it has no conversion yet.
    pub fn set_not_ready(&self, id: &SensorId) {
        self.put(id, Reading::NotReady);
    }

    /// Unplug a sensor.
    pub fn remove(&self, id: &SensorId) {
        self.lock().retain(|(sensor, _)| sensor != id);
    }

    /// Current reading, `None` if absent or not ready.
    #[must_use]
    pub fn temperature(&self, id: &SensorId) -> Option<f64> {
        match self.find(id) {
            Some(Reading::Celsius(celsius)) => Some(celsius),
            _ => None,
        }
    }

    /// Apply `f` to a sensor's reading. Absent or not-ready sensors are left alone.
    pub(crate) fn update(&self, id: &SensorId, f: impl FnOnce(f64) -> f64) {
        let mut readings = self.lock();
        if let Some((_, Reading::Celsius(celsius))) =
            readings.iter_mut().find(|(sensor, _)| sensor == id)
        {
            *celsius = f(*celsius);
        }
    }

    fn put(&self, id: &SensorId, reading: Reading) {
        let mut readings = self.lock();
        match readings.iter_mut().find(|(sensor, _)| sensor == id) {
            Some(entry) => entry.1 = reading,
            None => readings.push((id.clone(), reading)),
        }
    }

    fn find(&self, id: &SensorId) -> Option<Reading> {
        self.lock()
            .iter()
            .find(|(sensor, _)| sensor == id)
            .map(|(_, reading)| *reading)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SensorId, Reading)>> {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TemperatureSource for VirtualThermometers {
    fn list_sensor_ids(&self) -> impl Future<Output = Vec<SensorId>> + Send {
        let ids: Vec<SensorId> = self.lock().iter().map(|(id, _)| id.clone()).collect();
        async { ids }
    }

    fn read_temperature(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<f64, SensorError>> + Send {
        let result = match self.find(id) {
            Some(Reading::Celsius(celsius)) => Ok(celsius),
            Some(Reading::NotReady) => Err(SensorError::NotReady(id.clone())),
            None => Err(SensorError::NotFound(id.clone())),
        };
        tracing::trace!(sensor_id = %id, ?result, "virtual read");
        async { result }
    }
}
