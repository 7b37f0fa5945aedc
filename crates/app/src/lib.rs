//! # brewery-app
//!
//! Application layer — the program-management core and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TemperatureSource` — list sensors, read a temperature
//!   - `RelayBank` — read and switch relays
//!   - `ProgramStore` — load/store the program list and sensor catalogue
//! - Own the authoritative program list (`ProgramRegistry`): validation,
//!   persist-then-commit mutations, monitor rebuilds
//! - Run the per-program hysteresis state machine (`ZoneMonitor`)
//! - Drive everything periodically (`ControlLoop`)
//!
//! ## Dependency rule
//! Depends on `brewery-domain` only (plus `tokio` for the lock and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control_loop;
pub mod monitor;
pub mod ports;
pub mod registry;

#[cfg(test)]
pub(crate) mod fakes;
