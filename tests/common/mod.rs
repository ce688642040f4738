//! Shared test utilities: stub calculators and config files.

#![allow(dead_code, unused_imports)]

use calcpipe::buffer::SessionBuffer;
use calcpipe::child::{ChildProcess, ChildSpawnConfig};
use calcpipe::config::Config;
use calcpipe::protocol::ProtocolSettings;
use calcpipe::session::RequestSession;
use std::path::PathBuf;
use std::process::{ChildStdin, ChildStdout};
use std::time::Duration;
use tempfile::TempDir;

pub type ChildSession = RequestSession<ChildStdout, ChildStdin>;

/// Prints a banner, then evaluates each line with shell arithmetic.
pub const ARITHMETIC: &str = r#"printf 'stub calculator\n>>> '
while IFS= read -r line; do
  case "$line" in
    'quit()') exit 0 ;;
  esac
  echo "$(( $line ))"
  printf '>>> '
done"#;

/// Echoes each line back with the prompt split over two writes.
pub const SPLIT_PROMPT: &str = r#"printf '>>> '
while IFS= read -r line; do
  case "$line" in
    'quit()') exit 0 ;;
  esac
  printf '%s\n>>' "$line"
  sleep 0.1
  printf '> '
done"#;

/// Answers `slow` only after a delay; everything else immediately.
pub const SLOW_ON_REQUEST: &str = r#"printf '>>> '
while IFS= read -r line; do
  case "$line" in
    'quit()') exit 0 ;;
    slow) sleep 0.3; printf 'late\n>>> ' ;;
    *) echo "$(( $line ))"; printf '>>> ' ;;
  esac
done"#;

/// Ready, then dies with status 3 on the first request.
pub const CRASH_ON_INPUT: &str = r#"printf '>>> '
read -r line
exit 3"#;

/// Exits before ever printing a prompt.
pub const EXIT_IMMEDIATELY: &str = "exit 3";

/// Prints a prompt and then ignores stdin, including the quit directive.
pub const IGNORES_QUIT: &str = r#"printf '>>> '
exec sleep 30"#;

pub fn stub_spawn(script: &str) -> ChildSpawnConfig {
    ChildSpawnConfig::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// Launch a stub calculator and wrap it in a session.
pub fn launch_stub(script: &str, timeout: Duration) -> (ChildProcess, ChildSession) {
    let mut child = ChildProcess::launch(&stub_spawn(script)).expect("Failed to launch stub");
    let settings = ProtocolSettings {
        response_timeout: timeout,
        ..ProtocolSettings::default()
    };
    let channel = child.open_channel(settings).expect("Pipes already taken");
    let session = RequestSession::new(channel, SessionBuffer::new(1024, 4 * 1024 * 1024))
        .with_liveness(child.liveness());
    (child, session)
}

/// Write a config file whose child is `/bin/sh -c <script>`.
pub fn stub_config(script: &str, tweak: impl FnOnce(&mut Config)) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.child.program = "/bin/sh".to_string();
    config.child.args = vec!["-c".to_string(), script.to_string()];
    config.shutdown.grace_period_ms = 1000;
    tweak(&mut config);

    let content = toml::to_string(&config).expect("Failed to serialize config");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}
