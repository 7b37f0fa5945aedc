//! # breweryd — brewery temperature controller daemon
//!
//! Composition root that wires all adapters together and runs the control loop.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the hardware adapters and the program registry
//! - Optionally step the thermal model against the virtual sensors
//! - Run the control loop until SIGINT/SIGTERM; every relay is switched off
//!   on the way out
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use brewery_adapter_storage_sqlite_sqlx::{Config as StorageConfig, SqliteProgramStore};
use brewery_adapter_virtual::{
    SimulationParams, ThermalSimulation, VirtualRelayBank, VirtualThermometers,
};
use brewery_app::control_loop::{ControlLoop, ControlLoopConfig};
use brewery_app::registry::ProgramRegistry;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

type Registry = ProgramRegistry<SqliteProgramStore, VirtualThermometers, VirtualRelayBank>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter =
        EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let store = SqliteProgramStore::new(db.pool().clone());

    // Hardware
    let thermometers = Arc::new(VirtualThermometers::default());
    let relays = Arc::new(VirtualRelayBank::new(config.hardware.relays));

    // Registry
    let registry = Arc::new(ProgramRegistry::new(
        store,
        Arc::clone(&thermometers),
        Arc::clone(&relays),
    ));

    let simulation = config.hardware.simulate.then(|| {
        let model = ThermalSimulation::new(
            Arc::clone(&thermometers),
            Arc::clone(&relays),
            SimulationParams::default(),
        );
        spawn_simulation(Arc::clone(&registry), model, config.interval())
    });

    let control = ControlLoop::new(
        Arc::clone(&registry),
        relays,
        ControlLoopConfig {
            interval: config.interval(),
        },
    );
    tracing::info!(
        relays = config.hardware.relays,
        simulate = config.hardware.simulate,
        "breweryd starting"
    );
    let reason = control.run(shutdown_signal(), || true).await?;

    if let Some(task) = simulation {
        task.abort();
    }
    db.close().await;
    tracing::info!(?reason, "breweryd stopped");
    Ok(())
}

fn spawn_simulation(
    registry: Arc<Registry>,
    model: ThermalSimulation,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let programs = registry.get_all().await;
            model.step(&programs);
        }
    })
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
