//! Read-only status of a program, as reported to the administrative layer.

use serde::{Deserialize, Serialize};

use crate::fault::Fault;
use crate::id::ProgramId;

/// Live snapshot of one program: its fingerprint, latest reading and relays.
///
/// Relay flags are `None` for directions without an assigned relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramState {
    pub program_id: ProgramId,
    pub program_crc: String,
    pub current_temperature: Option<f64>,
    pub heating_activated: Option<bool>,
    pub cooling_activated: Option<bool>,
    pub fault: Option<Fault>,
}
