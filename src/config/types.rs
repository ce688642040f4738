use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub child: ChildConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// How to launch the calculator process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildConfig {
    /// Executable to run (default: "/usr/bin/python3").
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments passed to the executable (default: unbuffered mode + "symMath.py").
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Wire protocol settings for talking to the child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Prompt the child prints once a response is complete.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Directive written once at shutdown.
    #[serde(default = "default_quit_command")]
    pub quit_command: String,
    /// Deadline for a single response in milliseconds (default: 1000).
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Deadline for the startup banner in milliseconds (default: 10000).
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    /// Size of each read from the child's output pipe.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Largest response accepted before giving up on the sentinel.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Discard leftover output before the request that follows a timeout.
    #[serde(default = "default_drain_after_timeout")]
    pub drain_after_timeout: bool,
}

/// Session transcript buffer sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Advisory bound; growth past it is refused.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: usize,
}

/// Graceful exit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long to wait for the child to exit after the quit directive.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Liveness flag polling interval while waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_program() -> String {
    "/usr/bin/python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-u".to_string(), "symMath.py".to_string()]
}

fn default_sentinel() -> String {
    ">>> ".to_string()
}

fn default_quit_command() -> String {
    "quit()\n".to_string()
}

fn default_response_timeout_ms() -> u64 {
    1000
}

fn default_startup_timeout_ms() -> u64 {
    10_000
}

fn default_read_chunk_bytes() -> usize {
    4096
}

fn default_max_response_bytes() -> usize {
    1024 * 1024
}

fn default_drain_after_timeout() -> bool {
    true
}

fn default_initial_capacity() -> usize {
    1024
}

fn default_max_capacity() -> usize {
    4 * 1024 * 1024
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for ChildConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            env: HashMap::new(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            quit_command: default_quit_command(),
            response_timeout_ms: default_response_timeout_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            read_chunk_bytes: default_read_chunk_bytes(),
            max_response_bytes: default_max_response_bytes(),
            drain_after_timeout: default_drain_after_timeout(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ProtocolConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
