use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared "is the calculator still running" flag.
///
/// Cloned handles all observe the same flag. Only the exit watcher clears it.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call performed the transition.
    pub(crate) fn mark_exited(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    /// Poll until the flag clears or `timeout` passes.
    ///
    /// Returns whether the child is known to have exited.
    pub fn wait_for_exit(&self, timeout: Duration, poll_interval: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_alive() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(poll_interval.min(deadline - now));
        }
        true
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
