//! # brewery-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`ProgramStore`](brewery_app::ports::ProgramStore) port
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between program records and database rows
//!
//! ## Dependency rule
//! Depends on `brewery-app` (for port traits) and `brewery-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod program_store;

pub use pool::{Config, Database};
pub use program_store::SqliteProgramStore;
