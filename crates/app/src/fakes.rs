//! In-memory port implementations shared by the app crate's unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use brewery_domain::error::BreweryError;
use brewery_domain::fault::SensorError;
use brewery_domain::id::SensorId;
use brewery_domain::program::ProgramRecord;
use brewery_domain::sensor::Sensor;

use crate::ports::{ProgramStore, RelayBank, TemperatureSource};

#[derive(Debug, Clone, Copy)]
enum Reading {
    Celsius(f64),
    NotReady,
}

/// Sensors keyed by id, listed in insertion order.
#[derive(Default)]
pub struct FakeSensors {
    readings: Mutex<Vec<(SensorId, Reading)>>,
}

impl FakeSensors {
    pub fn with(ids: &[&str]) -> Self {
        let sensors = Self::default();
        for id in ids {
            sensors.set(id, 20.0);
        }
        sensors
    }

    pub fn set(&self, id: &str, celsius: f64) {
        self.put(id, Reading::Celsius(celsius));
    }

    pub fn set_not_ready(&self, id: &str) {
        self.put(id, Reading::NotReady);
    }

    pub fn remove(&self, id: &str) {
        self.readings
            .lock()
            .unwrap()
            .retain(|(sensor, _)| sensor.as_str() != id);
    }

    fn put(&self, id: &str, reading: Reading) {
        let mut readings = self.readings.lock().unwrap();
        match readings.iter_mut().find(|(sensor, _)| sensor.as_str() == id) {
            Some(entry) => entry.1 = reading,
            None => readings.push((SensorId::new(id), reading)),
        }
    }
}

impl TemperatureSource for FakeSensors {
    fn list_sensor_ids(&self) -> impl Future<Output = Vec<SensorId>> + Send {
        let ids: Vec<SensorId> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        async { ids }
    }

    fn read_temperature(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<f64, SensorError>> + Send {
        let reading = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .find(|(sensor, _)| sensor == id)
            .map(|(_, reading)| *reading);
        let result = match reading {
            Some(Reading::Celsius(celsius)) => Ok(celsius),
            Some(Reading::NotReady) => Err(SensorError::NotReady(id.clone())),
            None => Err(SensorError::NotFound(id.clone())),
        };
        async { result }
    }
}

/// Relays that remember their state and count every physical write.
pub struct FakeRelays {
    states: Mutex<Vec<bool>>,
    writes: AtomicUsize,
    touched: Mutex<Vec<usize>>,
}

impl FakeRelays {
    pub fn new(count: usize) -> Self {
        Self {
            states: Mutex::new(vec![false; count]),
            writes: AtomicUsize::new(0),
            touched: Mutex::new(Vec::new()),
        }
    }

    /// Set a relay without counting it as a write.
    pub fn force(&self, index: usize, on: bool) {
        self.states.lock().unwrap()[index] = on;
    }

    pub fn states(&self) -> Vec<bool> {
        self.states.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Indices written to, in order, duplicates included.
    pub fn touched(&self) -> Vec<usize> {
        self.touched.lock().unwrap().clone()
    }
}

impl RelayBank for FakeRelays {
    fn relay_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    fn is_on(&self, index: usize) -> bool {
        self.states.lock().unwrap()[index]
    }

    fn set(&self, index: usize, on: bool) {
        self.states.lock().unwrap()[index] = on;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.touched.lock().unwrap().push(index);
    }
}

/// Store that keeps the last written sets and can be told to fail writes.
#[derive(Default)]
pub struct InMemoryStore {
    programs: Mutex<Vec<ProgramRecord>>,
    sensors: Mutex<HashMap<SensorId, String>>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn with_records(records: Vec<ProgramRecord>) -> Self {
        let store = Self::default();
        *store.programs.lock().unwrap() = records;
        store
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<ProgramRecord> {
        self.programs.lock().unwrap().clone()
    }

    pub fn sensor_name(&self, id: &str) -> Option<String> {
        self.sensors.lock().unwrap().get(&SensorId::new(id)).cloned()
    }

    fn write_error(&self) -> Option<BreweryError> {
        self.failing
            .load(Ordering::SeqCst)
            .then(|| BreweryError::Storage("disk full".into()))
    }
}

impl ProgramStore for InMemoryStore {
    fn load_programs(
        &self,
    ) -> impl Future<Output = Result<Vec<ProgramRecord>, BreweryError>> + Send {
        let records = self.records();
        async { Ok(records) }
    }

    fn store_programs(
        &self,
        programs: Vec<ProgramRecord>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        let result = match self.write_error() {
            Some(err) => Err(err),
            None => {
                *self.programs.lock().unwrap() = programs;
                Ok(())
            }
        };
        async { result }
    }

    fn load_sensor_names(&self) -> impl Future<Output = Result<Vec<Sensor>, BreweryError>> + Send {
        let sensors: Vec<Sensor> = self
            .sensors
            .lock()
            .unwrap()
            .iter()
            .map(|(id, name)| Sensor::new(id.clone(), name.clone()))
            .collect();
        async { Ok(sensors) }
    }

    fn store_sensor_names(
        &self,
        sensors: Vec<Sensor>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        let result = match self.write_error() {
            Some(err) => Err(err),
            None => {
                *self.sensors.lock().unwrap() =
                    sensors.into_iter().map(|s| (s.id, s.name)).collect();
                Ok(())
            }
        };
        async { result }
    }
}
