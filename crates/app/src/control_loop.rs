//! Control loop — the periodic driver of every zone monitor.
//!
//! Each tick takes a snapshot of the registry, switches off relays no program
//! claims, then runs every monitor in list order. Once the loop is running a
//! [`RelayShutdownGuard`] is armed, so every relay goes off however `run`
//! ends: normal exit, error or unwinding panic.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use brewery_domain::error::BreweryError;
use brewery_domain::program::Program;

use crate::ports::{ProgramStore, RelayBank, TemperatureSource};
use crate::registry::{ControlSnapshot, ProgramRegistry};

/// Tuning of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLoopConfig {
    /// Pause between two ticks.
    pub interval: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The keep-running predicate returned `false`.
    Finished,
    /// The shutdown signal fired.
    Interrupted,
}

/// Switches every relay off when dropped.
pub struct RelayShutdownGuard<R: RelayBank> {
    relays: Arc<R>,
}

impl<R: RelayBank> RelayShutdownGuard<R> {
    pub fn arm(relays: Arc<R>) -> Self {
        Self { relays }
    }
}

impl<R: RelayBank> Drop for RelayShutdownGuard<R> {
    fn drop(&mut self) {
        self.relays.all_off();
        tracing::info!("all relays switched off");
    }
}

/// Periodic driver of the registry's zone monitors.
pub struct ControlLoop<S, T, R> {
    registry: Arc<ProgramRegistry<S, T, R>>,
    relays: Arc<R>,
    config: ControlLoopConfig,
}

impl<S, T, R> ControlLoop<S, T, R>
where
    S: ProgramStore,
    T: TemperatureSource,
    R: RelayBank,
{
    pub fn new(
        registry: Arc<ProgramRegistry<S, T, R>>,
        relays: Arc<R>,
        config: ControlLoopConfig,
    ) -> Self {
        Self {
            registry,
            relays,
            config,
        }
    }

    /// Load the registry, then tick until `keep_running` returns `false` or
    /// `shutdown` resolves.
    ///
    /// On the way out every program is halted and every relay switched off.
    ///
    /// # Errors
    ///
    /// Returns the load error before any tick runs if the stored programs
    /// cannot be installed.
    pub async fn run<F, P>(
        &self,
        shutdown: F,
        mut keep_running: P,
    ) -> Result<StopReason, BreweryError>
    where
        F: Future<Output = ()>,
        P: FnMut() -> bool,
    {
        self.registry.load().await?;
        let guard = RelayShutdownGuard::arm(Arc::clone(&self.relays));
        tracing::info!(interval = ?self.config.interval, "control loop started");

        tokio::pin!(shutdown);
        let reason = loop {
            if !keep_running() {
                break StopReason::Finished;
            }
            self.tick().await;
            tokio::select! {
                () = &mut shutdown => break StopReason::Interrupted,
                () = tokio::time::sleep(self.config.interval) => {}
            }
        };

        self.registry.halt().await;
        drop(guard);
        tracing::info!(?reason, "control loop stopped");
        Ok(reason)
    }

    /// One control step over the current snapshot.
    pub async fn tick(&self) {
        let ControlSnapshot { programs, monitors } = self.registry.snapshot().await;
        self.sweep_orphans(&programs);
        for monitor in monitors.iter() {
            monitor.check().await;
        }
    }

    fn sweep_orphans(&self, programs: &[Program]) {
        for index in 0..self.relays.relay_count() {
            if self.relays.is_on(index) && !programs.iter().any(|p| p.claims_relay(index)) {
                self.relays.set(index, false);
                tracing::info!(relay = index, "orphan relay switched off");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_domain::program::{ProgramDraft, ProgramRecord};

    use crate::fakes::{FakeRelays, FakeSensors, InMemoryStore};

    type Loop = ControlLoop<Arc<InMemoryStore>, FakeSensors, FakeRelays>;
    type Registry = ProgramRegistry<Arc<InMemoryStore>, FakeSensors, FakeRelays>;

    struct Harness {
        control: Loop,
        registry: Arc<Registry>,
        sensors: Arc<FakeSensors>,
        relays: Arc<FakeRelays>,
    }

    fn harness_with(store: InMemoryStore) -> Harness {
        let sensors = Arc::new(FakeSensors::with(&["s1", "s2"]));
        let relays = Arc::new(FakeRelays::new(4));
        let registry = Arc::new(ProgramRegistry::new(
            Arc::new(store),
            Arc::clone(&sensors),
            Arc::clone(&relays),
        ));
        let control = ControlLoop::new(
            Arc::clone(&registry),
            Arc::clone(&relays),
            ControlLoopConfig::default(),
        );
        Harness {
            control,
            registry,
            sensors,
            relays,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryStore::default())
    }

    fn cooler(sensor: &str, relay: usize) -> ProgramDraft {
        Program::builder()
            .sensor_id(sensor)
            .cooling_relay(relay)
            .range(10.0, 12.0)
            .draft()
    }

    #[tokio::test]
    async fn should_drive_each_program_relay_and_nothing_else() {
        let h = harness();
        h.registry.create(cooler("s1", 1)).await.unwrap();
        h.registry.create(cooler("s2", 2)).await.unwrap();
        h.sensors.set("s1", 13.0);
        h.sensors.set("s2", 13.0);

        h.control.tick().await;

        assert_eq!(h.relays.states(), vec![false, true, true, false]);
        let mut touched = h.relays.touched();
        touched.sort_unstable();
        assert_eq!(touched, vec![1, 2]);
    }

    #[tokio::test]
    async fn should_switch_off_relays_no_program_claims() {
        let h = harness();
        h.registry.create(cooler("s1", 1)).await.unwrap();
        h.sensors.set("s1", 13.0);
        h.relays.force(3, true);

        h.control.tick().await;

        assert!(!h.relays.is_on(3));
        assert!(h.relays.is_on(1));
    }

    #[tokio::test]
    async fn should_reclaim_relays_of_deleted_program_on_next_tick() {
        let h = harness();
        let program = h.registry.create(cooler("s1", 1)).await.unwrap();
        h.sensors.set("s1", 13.0);
        h.control.tick().await;
        assert!(h.relays.is_on(1));

        h.registry.delete(program.id).await.unwrap();
        assert!(h.relays.is_on(1));

        h.control.tick().await;
        assert!(!h.relays.is_on(1));
    }

    #[tokio::test]
    async fn should_keep_ticking_other_programs_when_one_sensor_fails() {
        let h = harness();
        h.registry.create(cooler("s1", 1)).await.unwrap();
        h.registry.create(cooler("s2", 2)).await.unwrap();
        h.sensors.set_not_ready("s1");
        h.sensors.set("s2", 13.0);

        h.control.tick().await;

        assert!(!h.relays.is_on(1));
        assert!(h.relays.is_on(2));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_and_switch_everything_off_when_predicate_ends() {
        let stored = Program::builder()
            .sensor_id("s1")
            .cooling_relay(1)
            .range(10.0, 12.0)
            .build();
        let h = harness_with(InMemoryStore::with_records(vec![ProgramRecord::from(&stored)]));
        h.sensors.set("s1", 13.0);

        let mut ticks = 0;
        let reason = h
            .control
            .run(std::future::pending(), || {
                ticks += 1;
                ticks <= 3
            })
            .await
            .unwrap();

        assert_eq!(reason, StopReason::Finished);
        assert_eq!(ticks, 4);
        assert_eq!(h.relays.states(), vec![false; 4]);
        assert!(h.registry.snapshot().await.monitors.is_empty());
        assert_eq!(h.registry.get_all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_when_shutdown_signal_fires() {
        let h = harness();
        h.registry.create(cooler("s1", 1)).await.unwrap();
        h.sensors.set("s1", 13.0);

        let shutdown = tokio::time::sleep(Duration::from_millis(2500));
        let reason = h.control.run(shutdown, || true).await.unwrap();

        assert_eq!(reason, StopReason::Interrupted);
        assert!(!h.relays.is_on(1));
    }

    #[tokio::test]
    async fn should_fail_before_any_tick_when_load_fails() {
        let mut record = ProgramRecord::from(&Program::builder().sensor_id("s1").build());
        record.id = None;
        let h = harness_with(InMemoryStore::with_records(vec![record]));
        h.relays.force(0, true);

        let result = h.control.run(std::future::pending(), || true).await;

        assert!(matches!(result, Err(BreweryError::Configuration(_))));
        assert_eq!(h.relays.write_count(), 0);
    }

    #[test]
    fn should_switch_all_relays_off_when_guard_dropped() {
        let relays = Arc::new(FakeRelays::new(3));
        relays.force(0, true);
        relays.force(2, true);

        drop(RelayShutdownGuard::arm(Arc::clone(&relays)));

        assert_eq!(relays.states(), vec![false; 3]);
        assert_eq!(relays.write_count(), 3);
    }
}
