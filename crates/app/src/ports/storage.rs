//! Storage port — persistence of the program list and the sensor catalogue.

use std::future::Future;
use std::sync::Arc;

use brewery_domain::error::BreweryError;
use brewery_domain::program::ProgramRecord;
use brewery_domain::sensor::Sensor;

/// Persistent store for the whole program set and the sensor names.
///
/// Both collections are written as a unit: a store call either replaces the
/// previous contents entirely or fails leaving them intact.
pub trait ProgramStore: Send + Sync {
    /// Load every stored program, in stored order.
    fn load_programs(
        &self,
    ) -> impl Future<Output = Result<Vec<ProgramRecord>, BreweryError>> + Send;

    /// Atomically replace the stored program list.
    fn store_programs(
        &self,
        programs: Vec<ProgramRecord>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send;

    /// Load the sensor display-name catalogue.
    fn load_sensor_names(&self) -> impl Future<Output = Result<Vec<Sensor>, BreweryError>> + Send;

    /// Atomically replace the sensor display-name catalogue.
    fn store_sensor_names(
        &self,
        sensors: Vec<Sensor>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send;
}

impl<S: ProgramStore> ProgramStore for Arc<S> {
    fn load_programs(
        &self,
    ) -> impl Future<Output = Result<Vec<ProgramRecord>, BreweryError>> + Send {
        (**self).load_programs()
    }

    fn store_programs(
        &self,
        programs: Vec<ProgramRecord>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        (**self).store_programs(programs)
    }

    fn load_sensor_names(&self) -> impl Future<Output = Result<Vec<Sensor>, BreweryError>> + Send {
        (**self).load_sensor_names()
    }

    fn store_sensor_names(
        &self,
        sensors: Vec<Sensor>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        (**self).store_sensor_names(sensors)
    }
}
