//! Simulated relay board.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use brewery_app::ports::RelayBank;

/// A bank of in-memory relays, all off at start.
///
/// Every call to [`set`](RelayBank::set) counts as a physical write, whether
/// or not it changes the state.
pub struct VirtualRelayBank {
    states: Vec<AtomicBool>,
    writes: AtomicUsize,
}

impl VirtualRelayBank {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            states: (0..count).map(|_| AtomicBool::new(false)).collect(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of physical writes performed so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current state of every relay.
    #[must_use]
    pub fn states(&self) -> Vec<bool> {
        self.states.iter().map(|s| s.load(Ordering::SeqCst)).collect()
    }
}

impl RelayBank for VirtualRelayBank {
    fn relay_count(&self) -> usize {
        self.states.len()
    }

    fn is_on(&self, index: usize) -> bool {
        self.states[index].load(Ordering::SeqCst)
    }

    fn set(&self, index: usize, on: bool) {
        self.states[index].store(on, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(relay = index, on, "virtual relay set");
    }
}
