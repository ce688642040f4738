use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownPhase {
    Running = 0,
    Signaled = 1,
    SendingQuit = 2,
    AwaitingExit = 3,
    Terminating = 4,
    Reaping = 5,
    Complete = 6,
}

/// Tracks the orderly exit sequence: stop input, send the quit directive,
/// wait for the child, kill it if needed, reap it.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(AtomicU8::new(ShutdownPhase::Running as u8)),
        }
    }

    /// Signal shutdown start
    pub fn signal(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            self.advance(ShutdownPhase::Signaled);
        }
    }

    /// Check if shutdown is in progress
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Get current phase
    pub fn phase(&self) -> ShutdownPhase {
        match self.phase.load(Ordering::SeqCst) {
            0 => ShutdownPhase::Running,
            1 => ShutdownPhase::Signaled,
            2 => ShutdownPhase::SendingQuit,
            3 => ShutdownPhase::AwaitingExit,
            4 => ShutdownPhase::Terminating,
            5 => ShutdownPhase::Reaping,
            _ => ShutdownPhase::Complete,
        }
    }

    /// Advance to the given phase. Later phases also mark shutdown as started.
    pub fn advance(&self, phase: ShutdownPhase) {
        if phase != ShutdownPhase::Running {
            self.shutdown.store(true, Ordering::SeqCst);
        }
        self.phase.store(phase as u8, Ordering::SeqCst);
        tracing::debug!(?phase, "shutdown phase");
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
