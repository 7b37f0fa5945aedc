//! Zone monitor — the per-program hysteresis controller.
//!
//! Each direction (cooling, heating) is a two-state machine whose current
//! state is the physical read-back of its relay:
//!
//! | direction | relay off → on   | relay on → off     |
//! |-----------|------------------|--------------------|
//! | cooling   | `t > max`        | `t <= midpoint`    |
//! | heating   | `t < min`        | `t >= midpoint`    |
//!
//! The band between `min` and `max` is the deadband: nothing changes there
//! unless a relay is already running towards the midpoint.

use std::sync::{Arc, Mutex, PoisonError};

use brewery_domain::fault::{Fault, SensorError, SensorFault};
use brewery_domain::program::Program;

use crate::ports::{RelayBank, TemperatureSource};

#[derive(Debug, Clone, Copy)]
enum Direction {
    Cooling,
    Heating,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cooling => "cooling",
            Self::Heating => "heating",
        }
    }
}

/// Drives the relays of one program from its sensor readings.
pub struct ZoneMonitor<T, R> {
    program: Program,
    sensors: Arc<T>,
    relays: Arc<R>,
    fault: Mutex<Option<Fault>>,
}

impl<T, R> ZoneMonitor<T, R>
where
    T: TemperatureSource,
    R: RelayBank,
{
    pub fn new(program: Program, sensors: Arc<T>, relays: Arc<R>) -> Self {
        Self {
            program,
            sensors,
            relays,
            fault: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Last sensor fault seen by [`check`](Self::check), cleared by the next
    /// successful read.
    pub fn fault(&self) -> Option<Fault> {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one control step.
    ///
    /// Never fails: sensor errors are recorded as a [`Fault`] and force the
    /// program's relays off until the sensor reads again.
    pub async fn check(&self) {
        if !self.program.active {
            self.switch_off();
            self.clear_fault();
            return;
        }

        match self.sensors.read_temperature(&self.program.sensor_id).await {
            Ok(temperature) => {
                self.clear_fault();
                self.regulate(temperature);
            }
            Err(err) => {
                self.sensor_failed(&err);
            }
        }
    }

    /// Record a failed read of this program's sensor and force its relays
    /// off. Returns the fault now on record.
    pub fn sensor_failed(&self, err: &SensorError) -> Fault {
        let (fault, changed) = self.record_fault(err.kind());
        if changed {
            tracing::warn!(
                program_id = %self.program.id,
                %err,
                "sensor fault, relays forced off"
            );
        }
        self.switch_off();
        fault
    }

    fn regulate(&self, temperature: f64) {
        let midpoint = self.program.midpoint();

        if let Some(index) = self.program.cooling_relay {
            let running = self.relays.is_on(index);
            let target = if running {
                temperature > midpoint
            } else {
                temperature > self.program.max_temperature
            };
            self.drive(Direction::Cooling, index, running, target, temperature);
        }

        if let Some(index) = self.program.heating_relay {
            let running = self.relays.is_on(index);
            let target = if running {
                temperature < midpoint
            } else {
                temperature < self.program.min_temperature
            };
            self.drive(Direction::Heating, index, running, target, temperature);
        }
    }

    fn drive(&self, direction: Direction, index: usize, running: bool, target: bool, t: f64) {
        if running == target {
            return;
        }
        self.relays.set(index, target);
        if target {
            tracing::info!(
                program_id = %self.program.id,
                direction = direction.as_str(),
                relay = index,
                temperature = t,
                "activated"
            );
        } else {
            tracing::info!(
                program_id = %self.program.id,
                direction = direction.as_str(),
                relay = index,
                temperature = t,
                "deactivated"
            );
        }
    }

    fn switch_off(&self) {
        for index in self.program.assigned_relays() {
            if self.relays.is_on(index) {
                self.relays.set(index, false);
                tracing::debug!(program_id = %self.program.id, relay = index, "relay switched off");
            }
        }
    }

    /// The flag is `true` when the fault kind changed.
    fn record_fault(&self, kind: SensorFault) -> (Fault, bool) {
        let mut fault = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *fault;
        let next = Fault::observe(previous, kind);
        *fault = Some(next);
        (next, previous.map(|f| f.kind) != Some(kind))
    }

    fn clear_fault(&self) {
        let mut fault = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        if fault.take().is_some() {
            tracing::info!(program_id = %self.program.id, "sensor recovered");
        }
    }
}
