//! Calculator process supervision: spawn, exit notification, shutdown.

mod error;
mod liveness;
mod process;
mod reaper;
mod spawn_config;

pub use error::SupervisorError;
pub use liveness::Liveness;
pub use process::{ChildChannel, ChildProcess};
pub use reaper::ChildReaper;
pub use spawn_config::ChildSpawnConfig;
