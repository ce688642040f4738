use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use calcpipe::buffer::SessionBuffer;
use calcpipe::child::{ChildProcess, ChildSpawnConfig};
use calcpipe::config::Config;
use calcpipe::display::Display;
use calcpipe::input::{LineSource, ReaderLines};
use calcpipe::logging::init_tracing;
use calcpipe::protocol::ProtocolSettings;
use calcpipe::session::RequestSession;
use calcpipe::shutdown::ShutdownCoordinator;

#[derive(Debug, Parser)]
#[command(
    name = "calcpipe",
    version,
    about = "Send lines to an interactive calculator and print its answers"
)]
struct Cli {
    /// Calculator executable (overrides [child] program; default /usr/bin/python3)
    program: Option<String>,

    /// Config file to use instead of ~/.config/calcpipe/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-request response timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.protocol.response_timeout_ms = timeout_ms;
        config.validate()?;
    }

    run(cli.program, &config)
}

fn run(program: Option<String>, config: &Config) -> Result<()> {
    let coordinator = ShutdownCoordinator::new();
    let spawn = ChildSpawnConfig::resolve(program, &config.child);

    let mut child = ChildProcess::launch(&spawn).context("Startup failure")?;
    let channel = child
        .open_channel(ProtocolSettings::from(&config.protocol))
        .context("Startup failure")?;
    let mut session = RequestSession::new(channel, SessionBuffer::from_config(&config.buffer))
        .with_protocol(&config.protocol)
        .with_liveness(child.liveness());

    if let Err(err) = session.await_ready(config.protocol.startup_timeout()) {
        drop(session);
        let status = child.shutdown(Duration::ZERO, config.shutdown.poll_interval(), &coordinator);
        tracing::debug!(?status, "calculator stopped after failed startup");
        bail!(
            "Startup failure: \"{}\" never printed its prompt ({})",
            spawn.program(),
            err
        );
    }

    let mut display = Display::new(io::stdout().lock());
    display.show_header()?;

    let mut input = ReaderLines::new(io::stdin().lock());
    while let Some(line) = input.next_line()? {
        match session.submit_line(&line) {
            Ok(exchange) => display.show_exchange(&exchange)?,
            Err(err) => {
                tracing::debug!(error = %err, "request failed");
                display.show_notice(&err)?;
            }
        }
    }

    coordinator.signal();
    let stats = session.finish(&coordinator);
    let status = child.shutdown(
        config.shutdown.grace_period(),
        config.shutdown.poll_interval(),
        &coordinator,
    )?;
    tracing::info!(
        submitted = stats.submitted,
        answered = stats.answered,
        failed = stats.failed,
        %status,
        "calculator session ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn program_defaults_to_config() {
        let cli = Cli::parse_from(["calcpipe"]);
        assert!(cli.program.is_none());
        assert!(cli.config.is_none());
        assert!(cli.timeout_ms.is_none());
    }

    #[test]
    fn program_and_flags() {
        let cli = Cli::parse_from([
            "calcpipe",
            "/opt/bin/python3",
            "--timeout-ms",
            "250",
            "--config",
            "/tmp/calc.toml",
        ]);
        assert_eq!(cli.program.as_deref(), Some("/opt/bin/python3"));
        assert_eq!(cli.timeout_ms, Some(250));
        assert_eq!(cli.config.unwrap().to_str(), Some("/tmp/calc.toml"));
    }
}
