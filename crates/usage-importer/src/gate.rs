//! Single-flight admission for import runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets at most one run through at a time
#[derive(Debug, Clone, Default)]
pub struct RunGate {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a run; dropping it reopens the gate
#[derive(Debug)]
#[must_use = "the gate reopens as soon as the permit is dropped"]
pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a run is already in progress
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RunPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
