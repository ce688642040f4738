//! Plain-text output for the session loop.

use std::io::{self, Write};

use crate::protocol::ProtocolError;
use crate::session::{Exchange, SessionError};

pub const USAGE_HEADER: &str = "'Esc' (or Ctrl-D) to quit. Enter to calculate";

/// Writes answers as `<request> = <answer>` and failures as one-line notices.
pub struct Display<W> {
    out: W,
}

impl<W: Write> Display<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn show_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", USAGE_HEADER)?;
        writeln!(self.out, "Answers:")?;
        self.out.flush()
    }

    pub fn show_exchange(&mut self, exchange: &Exchange) -> io::Result<()> {
        writeln!(self.out, "{} = {}", exchange.request(), exchange.answer())?;
        self.out.flush()
    }

    pub fn show_notice(&mut self, err: &SessionError) -> io::Result<()> {
        writeln!(self.out, "[{}] {}", notice_tag(err), err)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn notice_tag(err: &SessionError) -> &'static str {
    match err {
        SessionError::Protocol(ProtocolError::Timeout { .. }) => "timeout",
        SessionError::Protocol(ProtocolError::StreamClosed) | SessionError::ChildExited => {
            "calculator gone"
        }
        SessionError::Protocol(ProtocolError::ResponseTooLarge { .. }) => "too long",
        SessionError::Protocol(ProtocolError::Io(_)) => "io error",
        SessionError::Buffer(_) => "rejected",
    }
}
