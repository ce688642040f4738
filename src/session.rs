//! The request loop between the input layer and the calculator.
//!
//! Each completed line is appended to the session transcript and only the
//! newly appended bytes are sent. The submission cursor moves forward whether
//! or not the calculator answers; failed requests are never resent.

use std::borrow::Cow;
use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::time::Duration;

use thiserror::Error;

use crate::buffer::{BufferError, SessionBuffer};
use crate::child::Liveness;
use crate::config::ProtocolConfig;
use crate::protocol::{DuplexChannel, ProtocolError};
use crate::shutdown::{ShutdownCoordinator, ShutdownPhase};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The calculator exited earlier; nothing is sent any more.
    #[error("Calculator is no longer running")]
    ChildExited,
}

impl SessionError {
    /// True when the calculator can no longer answer requests.
    pub fn is_child_gone(&self) -> bool {
        match self {
            SessionError::ChildExited => true,
            SessionError::Protocol(err) => err.is_stream_closed(),
            SessionError::Buffer(_) => false,
        }
    }
}

/// One answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    request: String,
    response: String,
}

impl Exchange {
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
        }
    }

    /// The submitted line without its terminator.
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Everything the calculator printed before its prompt.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// The response with trailing line terminators removed.
    pub fn answer(&self) -> &str {
        self.response.trim_end_matches(&['\r', '\n'][..])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub submitted: u64,
    pub answered: u64,
    pub failed: u64,
}

pub struct RequestSession<R, W> {
    buffer: SessionBuffer,
    channel: DuplexChannel<R, W>,
    liveness: Option<Liveness>,
    quit_command: Vec<u8>,
    drain_after_timeout: bool,
    needs_drain: bool,
    child_gone: bool,
    stats: SessionStats,
}

impl<R, W> RequestSession<R, W>
where
    R: Read + AsFd,
    W: Write,
{
    pub fn new(channel: DuplexChannel<R, W>, buffer: SessionBuffer) -> Self {
        let protocol = ProtocolConfig::default();
        Self {
            buffer,
            channel,
            liveness: None,
            quit_command: protocol.quit_command.into_bytes(),
            drain_after_timeout: protocol.drain_after_timeout,
            needs_drain: false,
            child_gone: false,
            stats: SessionStats::default(),
        }
    }

    /// Apply the quit directive and drain policy from `[protocol]`.
    pub fn with_protocol(mut self, protocol: &ProtocolConfig) -> Self {
        self.quit_command = protocol.quit_command.as_bytes().to_vec();
        self.drain_after_timeout = protocol.drain_after_timeout;
        self
    }

    /// Consult `liveness` before every request.
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Read the calculator's startup banner up to its first prompt.
    pub fn await_ready(&mut self, timeout: Duration) -> Result<String, SessionError> {
        match self.channel.wait_for_sentinel(timeout) {
            Ok(banner) => {
                tracing::debug!(banner_bytes = banner.len(), "calculator ready");
                Ok(banner)
            }
            Err(err) => {
                if err.is_stream_closed() {
                    self.child_gone = true;
                }
                Err(err.into())
            }
        }
    }

    /// Append `line` to the transcript and send it.
    ///
    /// A missing trailing newline is added. The line counts as submitted
    /// even when the calculator fails to answer.
    pub fn submit_line(&mut self, line: &str) -> Result<Exchange, SessionError> {
        self.ensure_child_running()?;

        let request: Cow<'_, str> = if line.ends_with('\n') {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(format!("{}\n", line))
        };
        self.buffer.append(request.as_bytes())?;

        let pending = self.buffer.pending_range();
        self.buffer.mark_submitted();
        self.stats.submitted += 1;

        if self.needs_drain {
            self.needs_drain = false;
            if let Err(err) = self.channel.drain() {
                return Err(self.record_failure(err));
            }
        }

        let sent = self.buffer.slice(pending);
        match self.channel.submit(sent) {
            Ok(response) => {
                self.stats.answered += 1;
                let request = String::from_utf8_lossy(sent);
                Ok(Exchange::new(
                    request.trim_end_matches(&['\r', '\n'][..]),
                    response,
                ))
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    fn ensure_child_running(&mut self) -> Result<(), SessionError> {
        if !self.child_gone {
            if let Some(liveness) = &self.liveness {
                if !liveness.is_alive() {
                    tracing::warn!("calculator exited; refusing further requests");
                    self.child_gone = true;
                }
            }
        }
        if self.child_gone {
            return Err(SessionError::ChildExited);
        }
        Ok(())
    }

    fn record_failure(&mut self, err: ProtocolError) -> SessionError {
        self.stats.failed += 1;
        if err.is_stream_closed() {
            self.child_gone = true;
        } else if err.leaves_stale_output() && self.drain_after_timeout {
            self.needs_drain = true;
        }
        err.into()
    }

    pub fn buffer(&self) -> &SessionBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_child_gone(&self) -> bool {
        self.child_gone
    }

    /// Send the quit directive and close both pipes.
    pub fn finish(mut self, coordinator: &ShutdownCoordinator) -> SessionStats {
        coordinator.advance(ShutdownPhase::SendingQuit);
        let alive = self.liveness.as_ref().map_or(true, Liveness::is_alive);
        if !self.child_gone && alive {
            let quit = std::mem::take(&mut self.quit_command);
            if let Err(err) = self.channel.send(&quit) {
                tracing::debug!(error = %err, "quit directive not delivered");
            }
        }
        tracing::debug!(
            transcript_bytes = self.buffer.len(),
            submitted = self.stats.submitted,
            failed = self.stats.failed,
            "session finished"
        );
        self.stats
    }
}
