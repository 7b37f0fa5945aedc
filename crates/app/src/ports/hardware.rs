//! Hardware ports — temperature sensors and relays.
//!
//! Sensor reads are async: a 1-wire conversion can take most of a second.
//! Relay access is synchronous: a GPIO write is immediate, and the shutdown
//! guard has to be able to switch relays off from `Drop`.

use std::future::Future;
use std::sync::Arc;

use brewery_domain::fault::SensorError;
use brewery_domain::id::SensorId;

/// Source of temperature readings.
pub trait TemperatureSource: Send + Sync {
    /// Ids of every sensor currently present on the bus.
    fn list_sensor_ids(&self) -> impl Future<Output = Vec<SensorId>> + Send;

    /// Read the current temperature of one sensor, in °C.
    fn read_temperature(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<f64, SensorError>> + Send;
}

impl<T: TemperatureSource> TemperatureSource for Arc<T> {
    fn list_sensor_ids(&self) -> impl Future<Output = Vec<SensorId>> + Send {
        (**self).list_sensor_ids()
    }

    fn read_temperature(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<f64, SensorError>> + Send {
        (**self).read_temperature(id)
    }
}

/// A fixed-size bank of on/off relays addressed by index.
///
/// Callers only pass indices below [`relay_count`](Self::relay_count).
pub trait RelayBank: Send + Sync {
    /// Number of relays on the board.
    fn relay_count(&self) -> usize;

    /// Physical read-back of one relay.
    fn is_on(&self, index: usize) -> bool;

    /// Switch one relay.
    fn set(&self, index: usize, on: bool);

    /// Force every relay off, without consulting the read-back.
    fn all_off(&self) {
        for index in 0..self.relay_count() {
            self.set(index, false);
        }
    }
}

impl<R: RelayBank> RelayBank for Arc<R> {
    fn relay_count(&self) -> usize {
        (**self).relay_count()
    }

    fn is_on(&self, index: usize) -> bool {
        (**self).is_on(index)
    }

    fn set(&self, index: usize, on: bool) {
        (**self).set(index, on);
    }

    fn all_off(&self) {
        (**self).all_off();
    }
}
