//! # brewery-domain
//!
//! Pure domain model for the brewery temperature controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Programs** (one sensor, up to two relays, a temperature band)
//! - Define the persisted **program record** and the derived crc fingerprint
//! - Define **Sensors** (the display-name catalogue)
//! - Define **Faults** and the read-only **program state** reported to clients
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod fault;
pub mod program;
pub mod sensor;
pub mod state;
