use std::process::Child;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use signal_hook::consts::signal::SIGCHLD;
use signal_hook::iterator::Signals;

use crate::child::error::SupervisorError;
use crate::child::liveness::Liveness;

/// Watches for SIGCHLD and records when the calculator exits.
///
/// The signal handler installed by `signal-hook` only wakes this thread; the
/// status collection and flag update happen here, outside signal context.
/// The exit status stays cached in the `Child` so the final `wait` at
/// shutdown returns it.
pub struct ChildReaper {
    handle: signal_hook::iterator::Handle,
    thread: thread::JoinHandle<()>,
}

impl ChildReaper {
    pub fn start(child: Arc<Mutex<Child>>, liveness: Liveness) -> Result<Self, SupervisorError> {
        let mut signals = Signals::new([SIGCHLD]).map_err(SupervisorError::SignalRegistration)?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("child-reaper".to_string())
            .spawn(move || {
                // The child may have exited before the handler was installed.
                if collect_exit(&child, &liveness) {
                    return;
                }
                for _ in signals.forever() {
                    if collect_exit(&child, &liveness) {
                        break;
                    }
                }
            })
            .map_err(SupervisorError::Thread)?;
        Ok(Self { handle, thread })
    }

    pub fn stop(self) {
        self.handle.close();
        let _ = self.thread.join();
    }
}

/// Returns `true` once the child is gone.
///
/// SIGCHLD is process-wide, so a wakeup may belong to some other child; only
/// our own pid is polled, without blocking.
fn collect_exit(child: &Mutex<Child>, liveness: &Liveness) -> bool {
    let mut child = child.lock();
    match child.try_wait() {
        Ok(Some(status)) => {
            if liveness.mark_exited() {
                tracing::info!(pid = child.id(), %status, "calculator process exited");
            }
            true
        }
        Ok(None) => false,
        Err(err) => {
            tracing::warn!(pid = child.id(), error = %err, "lost track of calculator process");
            liveness.mark_exited();
            true
        }
    }
}
