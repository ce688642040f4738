//! Configuration loading for the calculator front end.
//!
//! Values come from `~/.config/calcpipe/config.toml` when present and fall
//! back to built-in defaults otherwise. Command-line flags override individual
//! fields after loading.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{BufferConfig, ChildConfig, Config, ProtocolConfig, ShutdownConfig};
