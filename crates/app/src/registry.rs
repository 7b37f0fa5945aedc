//! Program registry — the single owner of the program list.
//!
//! Every public operation takes the registry lock exactly once and then works
//! on the guarded [`Inner`] through private helpers, so no operation ever
//! needs to re-enter the lock. Hardware I/O needed for validation (the list of
//! sensor ids) happens before the lock is taken.
//!
//! Mutations follow the same sequence: validate, build the candidate list,
//! persist it, and only then install it and rebuild the zone monitors. A store
//! failure leaves the installed list untouched.

use std::sync::Arc;

use tokio::sync::Mutex;

use brewery_domain::error::{BreweryError, ConfigurationError, NotFoundError, ValidationError};
use brewery_domain::fault::Fault;
use brewery_domain::id::{ProgramId, SensorId};
use brewery_domain::program::{Program, ProgramDraft, ProgramRecord};
use brewery_domain::sensor::Sensor;
use brewery_domain::state::ProgramState;

use crate::monitor::ZoneMonitor;
use crate::ports::{ProgramStore, RelayBank, TemperatureSource};

/// What the control loop needs for one tick, cloned out of the lock.
pub struct ControlSnapshot<T, R> {
    pub programs: Arc<[Program]>,
    pub monitors: Arc<[ZoneMonitor<T, R>]>,
}

struct Inner<T, R> {
    programs: Arc<[Program]>,
    /// One per program, same order. Empty once halted.
    monitors: Arc<[ZoneMonitor<T, R>]>,
    sensor_names: Vec<Sensor>,
    halted: bool,
}

/// Authoritative, persisted list of temperature programs.
pub struct ProgramRegistry<S, T, R> {
    store: S,
    sensors: Arc<T>,
    relays: Arc<R>,
    inner: Mutex<Inner<T, R>>,
}

impl<S, T, R> ProgramRegistry<S, T, R>
where
    S: ProgramStore,
    T: TemperatureSource,
    R: RelayBank,
{
    /// Create an empty registry. Call [`load`](Self::load) before use.
    pub fn new(store: S, sensors: Arc<T>, relays: Arc<R>) -> Self {
        Self {
            store,
            sensors,
            relays,
            inner: Mutex::new(Inner {
                programs: Arc::from(Vec::new()),
                monitors: Arc::from(Vec::new()),
                sensor_names: Vec::new(),
                halted: false,
            }),
        }
    }

    /// Replace the in-memory state with what the store holds.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::Configuration`] if any stored program is
    /// malformed or conflicts with another one, or a storage error. Nothing is
    /// installed in either case.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<(), BreweryError> {
        let mut inner = self.inner.lock().await;

        let records = self.store.load_programs().await?;
        let programs = records
            .into_iter()
            .map(Program::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        for (position, program) in programs.iter().enumerate() {
            self.check_consistency(&programs[..position], program)
                .map_err(|source| ConfigurationError::Rejected {
                    id: program.id.to_string(),
                    source,
                })?;
        }
        let sensor_names = self.store.load_sensor_names().await?;

        tracing::info!(
            programs = programs.len(),
            sensors = sensor_names.len(),
            "programs loaded"
        );
        inner.sensor_names = sensor_names;
        self.install(&mut inner, programs);
        Ok(())
    }

    /// Add a new program under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::Validation`] if the candidate is rejected, or a
    /// storage error if persisting fails. The list is unchanged on error.
    #[tracing::instrument(skip(self, draft), fields(sensor_id = %draft.sensor_id))]
    pub async fn create(&self, draft: ProgramDraft) -> Result<Program, BreweryError> {
        let known = self.sensors.list_sensor_ids().await;
        let mut inner = self.inner.lock().await;

        let program = Program::from_draft(ProgramId::new(), draft);
        self.validate(&inner.programs, &program, &known)?;

        let mut next = inner.programs.to_vec();
        next.push(program.clone());
        self.commit(&mut inner, next).await?;

        tracing::info!(program_id = %program.id, "program created");
        Ok(program)
    }

    /// Replace the program `id` with `draft`, keeping its id and position.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::NotFound`] if no program has this id,
    /// [`BreweryError::Validation`] if the candidate is rejected, or a storage
    /// error. The list is unchanged on error.
    #[tracing::instrument(skip(self, draft))]
    pub async fn modify(
        &self,
        id: ProgramId,
        draft: ProgramDraft,
    ) -> Result<Program, BreweryError> {
        let known = self.sensors.list_sensor_ids().await;
        let mut inner = self.inner.lock().await;

        let position = position_of(&inner.programs, id)?;
        let program = Program::from_draft(id, draft);
        self.validate(&inner.programs, &program, &known)?;

        let mut next = inner.programs.to_vec();
        next[position] = program.clone();
        self.commit(&mut inner, next).await?;

        tracing::info!(program_id = %id, crc = %program.crc(), "program modified");
        Ok(program)
    }

    /// Remove the program `id`.
    ///
    /// Its relays are left as they are; the control loop switches them off as
    /// orphans on its next tick.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::NotFound`] if no program has this id, or a
    /// storage error. The list is unchanged on error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProgramId) -> Result<(), BreweryError> {
        let mut inner = self.inner.lock().await;

        let position = position_of(&inner.programs, id)?;
        let mut next = inner.programs.to_vec();
        next.remove(position);
        self.commit(&mut inner, next).await?;

        tracing::info!(program_id = %id, "program deleted");
        Ok(())
    }

    /// Current program list. The returned slice is never mutated.
    pub async fn get_all(&self) -> Arc<[Program]> {
        Arc::clone(&self.inner.lock().await.programs)
    }

    /// # Errors
    ///
    /// Returns [`BreweryError::NotFound`] if no program has this id.
    pub async fn get(&self, id: ProgramId) -> Result<Program, BreweryError> {
        let inner = self.inner.lock().await;
        let position = position_of(&inner.programs, id)?;
        Ok(inner.programs[position].clone())
    }

    /// Live status of one program: a fresh sensor reading and the physical
    /// relay states.
    ///
    /// A failed read is handled as the control loop would: the fault is
    /// recorded on the program's monitor and its relays are forced off
    /// before they are read back.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::NotFound`] if no program has this id.
    pub async fn get_state(&self, id: ProgramId) -> Result<ProgramState, BreweryError> {
        let (ControlSnapshot { programs, monitors }, position) = {
            let inner = self.inner.lock().await;
            let position = position_of(&inner.programs, id)?;
            let snapshot = ControlSnapshot {
                programs: Arc::clone(&inner.programs),
                monitors: Arc::clone(&inner.monitors),
            };
            (snapshot, position)
        };
        Ok(self.observe(&programs[position], monitors.get(position)).await)
    }

    /// Live status of every program, in list order.
    pub async fn get_all_states(&self) -> Vec<ProgramState> {
        let ControlSnapshot { programs, monitors } = self.snapshot().await;
        let mut states = Vec::with_capacity(programs.len());
        for (position, program) in programs.iter().enumerate() {
            states.push(self.observe(program, monitors.get(position)).await);
        }
        states
    }

    /// Sensors currently reported by the hardware, with their catalogue names.
    pub async fn list_sensors(&self) -> Vec<Sensor> {
        let ids = self.sensors.list_sensor_ids().await;
        let inner = self.inner.lock().await;
        ids.into_iter()
            .map(|id| {
                let name = inner
                    .sensor_names
                    .iter()
                    .find(|sensor| sensor.id == id)
                    .map(|sensor| sensor.name.clone())
                    .unwrap_or_default();
                Sensor::new(id, name)
            })
            .collect()
    }

    /// Give a sensor a display name and persist the catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`BreweryError::NotFound`] if the hardware does not report this
    /// sensor, or a storage error. The catalogue is unchanged on error.
    #[tracing::instrument(skip(self, name))]
    pub async fn set_sensor_name(
        &self,
        id: SensorId,
        name: String,
    ) -> Result<Sensor, BreweryError> {
        let known = self.sensors.list_sensor_ids().await;
        if !known.contains(&id) {
            return Err(NotFoundError {
                entity: "Sensor",
                id: id.to_string(),
            }
            .into());
        }

        let mut inner = self.inner.lock().await;
        let sensor = Sensor::new(id, name);
        let mut next = inner.sensor_names.clone();
        match next.iter_mut().find(|entry| entry.id == sensor.id) {
            Some(entry) => entry.name.clone_from(&sensor.name),
            None => next.push(sensor.clone()),
        }
        self.store.store_sensor_names(next.clone()).await?;
        inner.sensor_names = next;

        tracing::info!(sensor_id = %sensor.id, name = %sensor.name, "sensor renamed");
        Ok(sensor)
    }

    /// Programs and monitors for one control tick.
    pub async fn snapshot(&self) -> ControlSnapshot<T, R> {
        let inner = self.inner.lock().await;
        ControlSnapshot {
            programs: Arc::clone(&inner.programs),
            monitors: Arc::clone(&inner.monitors),
        }
    }

    /// Stop every program from driving relays, without touching the store.
    ///
    /// Later mutations still update and persist the list but no longer
    /// rebuild monitors.
    pub async fn halt(&self) {
        let mut inner = self.inner.lock().await;
        inner.halted = true;
        inner.monitors = Arc::from(Vec::new());
        tracing::info!("all programs halted");
    }

    async fn commit(
        &self,
        inner: &mut Inner<T, R>,
        programs: Vec<Program>,
    ) -> Result<(), BreweryError> {
        let records = programs.iter().map(ProgramRecord::from).collect();
        self.store.store_programs(records).await?;
        self.install(inner, programs);
        Ok(())
    }

    fn install(&self, inner: &mut Inner<T, R>, programs: Vec<Program>) {
        if inner.halted {
            inner.programs = Arc::from(programs);
            return;
        }
        let monitors: Vec<_> = programs
            .iter()
            .map(|program| {
                ZoneMonitor::new(
                    program.clone(),
                    Arc::clone(&self.sensors),
                    Arc::clone(&self.relays),
                )
            })
            .collect();
        inner.programs = Arc::from(programs);
        inner.monitors = Arc::from(monitors);
    }

    /// Full validation of a candidate against the installed list.
    fn validate(
        &self,
        programs: &[Program],
        candidate: &Program,
        known_sensors: &[SensorId],
    ) -> Result<(), ValidationError> {
        check_conflicts(programs, candidate)?;
        if !known_sensors.contains(&candidate.sensor_id) {
            return Err(ValidationError::UnknownSensor {
                sensor_id: candidate.sensor_id.clone(),
            });
        }
        self.check_relay_range(candidate)
    }

    /// Validation applied to stored programs. A sensor missing at boot is a
    /// runtime fault, not a configuration error, so it is not checked here.
    fn check_consistency(
        &self,
        others: &[Program],
        candidate: &Program,
    ) -> Result<(), ValidationError> {
        check_conflicts(others, candidate)?;
        self.check_relay_range(candidate)
    }

    fn check_relay_range(&self, candidate: &Program) -> Result<(), ValidationError> {
        let relay_count = self.relays.relay_count();
        match candidate.assigned_relays().find(|&index| index >= relay_count) {
            Some(index) => Err(ValidationError::RelayOutOfRange { index, relay_count }),
            None => Ok(()),
        }
    }

    async fn observe(
        &self,
        program: &Program,
        monitor: Option<&ZoneMonitor<T, R>>,
    ) -> ProgramState {
        let (current_temperature, fault) =
            match self.sensors.read_temperature(&program.sensor_id).await {
                Ok(temperature) => (Some(temperature), None),
                Err(err) => {
                    // halted: nothing drives relays, nothing to record on
                    let fault = match monitor {
                        Some(monitor) => monitor.sensor_failed(&err),
                        None => Fault::new(err.kind()),
                    };
                    (None, Some(fault))
                }
            };
        ProgramState {
            program_id: program.id,
            program_crc: program.crc(),
            current_temperature,
            heating_activated: program.heating_relay.map(|index| self.relays.is_on(index)),
            cooling_activated: program.cooling_relay.map(|index| self.relays.is_on(index)),
            fault,
        }
    }
}

/// Uniqueness of sensor, cooling relay and heating relay against every other
/// program, checked program by program in that order.
fn check_conflicts(programs: &[Program], candidate: &Program) -> Result<(), ValidationError> {
    for other in programs.iter().filter(|other| other.id != candidate.id) {
        if other.sensor_id == candidate.sensor_id {
            return Err(ValidationError::DuplicateSensor {
                sensor_id: candidate.sensor_id.clone(),
            });
        }
        if let Some(index) = candidate.cooling_relay.filter(|&i| other.cooling_relay == Some(i)) {
            return Err(ValidationError::DuplicateCoolingRelay { index });
        }
        if let Some(index) = candidate.heating_relay.filter(|&i| other.heating_relay == Some(i)) {
            return Err(ValidationError::DuplicateHeatingRelay { index });
        }
    }
    Ok(())
}

fn position_of(programs: &[Program], id: ProgramId) -> Result<usize, NotFoundError> {
    programs
        .iter()
        .position(|program| program.id == id)
        .ok_or_else(|| NotFoundError {
            entity: "Program",
            id: id.to_string(),
        })
}
