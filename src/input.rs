//! Line input for the session loop.
//!
//! Stands in for a full-screen editor: it only hands over completed lines
//! and reports when the user wants to stop.

use std::io::{self, BufRead};

/// Esc anywhere in a line ends the session; the rest of that line is dropped.
pub const STOP_CHAR: char = '\u{1b}';

/// Source of completed input lines. `Ok(None)` is the stop signal.
pub trait LineSource {
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads lines from any `BufRead`, stripping `\n` / `\r\n`.
///
/// End of input and any line containing the Esc character both stop.
pub struct ReaderLines<B> {
    reader: B,
    stopped: bool,
}

impl<B: BufRead> ReaderLines<B> {
    pub fn new(reader: B) -> Self {
        Self {
            reader,
            stopped: false,
        }
    }
}

impl<B: BufRead> LineSource for ReaderLines<B> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.stopped {
            return Ok(None);
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            self.stopped = true;
            return Ok(None);
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.contains(STOP_CHAR) {
            self.stopped = true;
            return Ok(None);
        }
        Ok(Some(line.to_string()))
    }
}
