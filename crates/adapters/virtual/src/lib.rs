//! # brewery-adapter-virtual
//!
//! Virtual hardware for development and demonstration: the controller runs
//! unchanged against it, without GPIO or a 1-wire bus.
//!
//! ## Provided hardware
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`VirtualThermometers`] | `TemperatureSource` | Four sensors `fake_sensor_1..4` at 18.0 °C, settable |
//! | [`VirtualRelayBank`] | `RelayBank` | `N` in-memory relays, counts physical writes |
//! | [`ThermalSimulation`] | — | Moves temperatures according to the relays each program drives |
//!
//! ## Dependency rule
//!
//! Depends on `brewery-app` (port traits) and `brewery-domain` only.

mod relays;
mod simulation;
mod thermometers;

pub use relays::VirtualRelayBank;
pub use simulation::{SimulationParams, ThermalSimulation};
pub use thermometers::{FAKE_SENSORS, VirtualThermometers};
