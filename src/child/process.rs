use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::child::error::SupervisorError;
use crate::child::liveness::Liveness;
use crate::child::reaper::ChildReaper;
use crate::child::spawn_config::ChildSpawnConfig;
use crate::protocol::{DuplexChannel, ProtocolSettings};
use crate::shutdown::{ShutdownCoordinator, ShutdownPhase};

/// Channel type produced by [`ChildProcess::open_channel`].
pub type ChildChannel = DuplexChannel<ChildStdout, ChildStdin>;

/// The supervised calculator process.
///
/// Owns the process handle for the whole run. The two pipe endpoints are
/// handed to the protocol channel once; dropping that channel closes them.
pub struct ChildProcess {
    child: Arc<Mutex<Child>>,
    pid: u32,
    pipes: Option<(ChildStdin, ChildStdout)>,
    liveness: Liveness,
    reaper: Option<ChildReaper>,
    exit_status: Option<ExitStatus>,
}

impl ChildProcess {
    /// Spawn the calculator with its stdin and stdout on private pipes.
    ///
    /// stderr is inherited so the child's own diagnostics stay visible.
    pub fn launch(spawn: &ChildSpawnConfig) -> Result<Self, SupervisorError> {
        let mut command = Command::new(spawn.program());
        command
            .args(spawn.args())
            .envs(spawn.env().iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
            program: spawn.program().to_string(),
            source,
        })?;
        let pid = child.id();

        let pipes = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SupervisorError::PipesUnavailable);
            }
        };

        let child = Arc::new(Mutex::new(child));
        let liveness = Liveness::new();
        let reaper = match ChildReaper::start(Arc::clone(&child), liveness.clone()) {
            Ok(reaper) => reaper,
            Err(err) => {
                let mut child = child.lock();
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };

        tracing::info!(
            pid,
            program = spawn.program(),
            args = ?spawn.args(),
            "launched calculator"
        );

        Ok(Self {
            child,
            pid,
            pipes: Some(pipes),
            liveness,
            reaper: Some(reaper),
            exit_status: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Move the pipe endpoints into a protocol channel. Only succeeds once.
    pub fn open_channel(
        &mut self,
        settings: ProtocolSettings,
    ) -> Result<ChildChannel, SupervisorError> {
        let (stdin, stdout) = self.pipes.take().ok_or(SupervisorError::PipesUnavailable)?;
        Ok(DuplexChannel::new(stdout, stdin, settings))
    }

    /// Wait for the child to exit on its own, kill it after `grace`, and reap
    /// it exactly once.
    ///
    /// Expects the quit directive to have been sent and the channel dropped.
    /// Calling it again returns the status collected the first time.
    pub fn shutdown(
        &mut self,
        grace: Duration,
        poll_interval: Duration,
        coordinator: &ShutdownCoordinator,
    ) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        // Unclaimed pipes would keep the child blocked on stdin.
        self.pipes = None;

        coordinator.advance(ShutdownPhase::AwaitingExit);
        if !self.liveness.wait_for_exit(grace, poll_interval) {
            coordinator.advance(ShutdownPhase::Terminating);
            tracing::warn!(
                pid = self.pid,
                grace_ms = grace.as_millis() as u64,
                "calculator ignored quit; killing it"
            );
            let _ = self.child.lock().kill();
        }

        coordinator.advance(ShutdownPhase::Reaping);
        if let Some(reaper) = self.reaper.take() {
            reaper.stop();
        }
        let status = self.child.lock().wait().map_err(SupervisorError::Wait)?;
        self.liveness.mark_exited();
        self.exit_status = Some(status);
        coordinator.advance(ShutdownPhase::Complete);
        tracing::info!(pid = self.pid, %status, "calculator reaped");
        Ok(status)
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        self.pipes = None;
        let _ = self.child.lock().kill();
        if let Some(reaper) = self.reaper.take() {
            reaper.stop();
        }
        let _ = self.child.lock().wait();
    }
}
