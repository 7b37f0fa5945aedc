//! A crude thermal model so a virtual setup actually converges.

use std::sync::Arc;

use brewery_app::ports::RelayBank;
use brewery_domain::program::Program;

use crate::relays::VirtualRelayBank;
use crate::thermometers::VirtualThermometers;

/// Per-step behaviour of the thermal model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// °C gained per step while a heating relay is on.
    pub heating_rate: f64,
    /// °C lost per step while a cooling relay is on.
    pub cooling_rate: f64,
    /// Temperature zones drift towards when nothing drives them.
    pub ambient: f64,
    /// Fraction of the gap to ambient closed per idle step, in `0.0..=1.0`.
    pub drift: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            heating_rate: 0.1,
            cooling_rate: 0.1,
            ambient: 20.0,
            drift: 0.01,
        }
    }
}

/// Moves virtual sensor readings according to the relays programs drive.
pub struct ThermalSimulation {
    thermometers: Arc<VirtualThermometers>,
    relays: Arc<VirtualRelayBank>,
    params: SimulationParams,
}

impl ThermalSimulation {
    #[must_use]
    pub fn new(
        thermometers: Arc<VirtualThermometers>,
        relays: Arc<VirtualRelayBank>,
        params: SimulationParams,
    ) -> Self {
        Self {
            thermometers,
            relays,
            params,
        }
    }

    /// Advance every program's zone by one step.
    ///
    /// Heating and cooling relays add up when both are on; a zone with
    /// neither running drifts towards ambient.
    pub fn step(&self, programs: &[Program]) {
        for program in programs {
            let heating = program.heating_relay.is_some_and(|i| self.relays.is_on(i));
            let cooling = program.cooling_relay.is_some_and(|i| self.relays.is_on(i));
            let params = self.params;

            self.thermometers.update(&program.sensor_id, |t| {
                if !heating && !cooling {
                    return t + (params.ambient - t) * params.drift;
                }
                let mut next = t;
                if heating {
                    next += params.heating_rate;
                }
                if cooling {
                    next -= params.cooling_rate;
                }
                next
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_domain::id::SensorId;

    fn setup() -> (ThermalSimulation, Arc<VirtualThermometers>, Arc<VirtualRelayBank>) {
        let thermometers = Arc::new(VirtualThermometers::with_sensors(&["a", "b"], 18.0));
        let relays = Arc::new(VirtualRelayBank::new(4));
        let simulation = ThermalSimulation::new(
            Arc::clone(&thermometers),
            Arc::clone(&relays),
            SimulationParams {
                heating_rate: 0.5,
                cooling_rate: 0.25,
                ambient: 20.0,
                drift: 0.5,
            },
        );
        (simulation, thermometers, relays)
    }

    fn zone(sensor: &str, heating: usize, cooling: usize) -> Program {
        Program::builder()
            .sensor_id(sensor)
            .heating_relay(heating)
            .cooling_relay(cooling)
            .range(18.0, 19.0)
            .build()
    }

    fn reading(thermometers: &VirtualThermometers, id: &str) -> f64 {
        thermometers.temperature(&SensorId::new(id)).unwrap()
    }

    #[test]
    fn should_warm_zone_when_heating_relay_on() {
        let (simulation, thermometers, relays) = setup();
        relays.set(0, true);

        simulation.step(&[zone("a", 0, 1)]);

        assert!((reading(&thermometers, "a") - 18.5).abs() < 1e-9);
    }

    #[test]
    fn should_cool_zone_when_cooling_relay_on() {
        let (simulation, thermometers, relays) = setup();
        relays.set(1, true);

        simulation.step(&[zone("a", 0, 1)]);

        assert!((reading(&thermometers, "a") - 17.75).abs() < 1e-9);
    }

    #[test]
    fn should_drift_towards_ambient_when_idle() {
        let (simulation, thermometers, _relays) = setup();

        simulation.step(&[zone("a", 0, 1)]);

        assert!((reading(&thermometers, "a") - 19.0).abs() < 1e-9);
    }

    #[test]
    fn should_only_move_sensors_of_given_programs() {
        let (simulation, thermometers, relays) = setup();
        relays.set(2, true);

        simulation.step(&[zone("b", 2, 3)]);

        assert!((reading(&thermometers, "a") - 18.0).abs() < 1e-9);
        assert!((reading(&thermometers, "b") - 18.5).abs() < 1e-9);
    }
}
