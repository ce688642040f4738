use std::io;

use thiserror::Error;

/// Failures while starting, watching or stopping the calculator process.
///
/// Everything raised by `launch` is a startup failure and ends the program.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Pipe creation, fork or exec failed.
    #[error("Cannot run \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The pipes were never created or were already handed out.
    #[error("Calculator pipes are not available")]
    PipesUnavailable,

    #[error("Failed to install child exit handler: {0}")]
    SignalRegistration(#[source] io::Error),

    #[error("Failed to start child watcher thread: {0}")]
    Thread(#[source] io::Error),

    #[error("Failed to reap calculator process: {0}")]
    Wait(#[source] io::Error),
}
