use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::time::Duration;

use thiserror::Error;

use crate::config::ProtocolConfig;
use crate::protocol::sentinel::SentinelScanner;
use crate::protocol::timeout::{select_readable, Readiness, TimeoutGuard};

/// Errors from a single request/response exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No prompt arrived before the deadline.
    #[error("No prompt from calculator within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The child closed its end of a pipe.
    #[error("Calculator closed its output stream")]
    StreamClosed,

    /// Output kept coming without a prompt.
    #[error("Response exceeded {limit} bytes without a prompt")]
    ResponseTooLarge { limit: usize },

    #[error("I/O error talking to calculator: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, ProtocolError::StreamClosed)
    }

    /// True when unread output may still be sitting in the pipe.
    pub fn leaves_stale_output(&self) -> bool {
        matches!(
            self,
            ProtocolError::Timeout { .. } | ProtocolError::ResponseTooLarge { .. }
        )
    }
}

/// Protocol parameters, usually derived from `[protocol]` in the config.
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    pub sentinel: Vec<u8>,
    pub response_timeout: Duration,
    pub read_chunk_bytes: usize,
    pub max_response_bytes: usize,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self::from(&ProtocolConfig::default())
    }
}

impl From<&ProtocolConfig> for ProtocolSettings {
    fn from(config: &ProtocolConfig) -> Self {
        Self {
            sentinel: config.sentinel.as_bytes().to_vec(),
            response_timeout: config.response_timeout(),
            read_chunk_bytes: config.read_chunk_bytes.max(1),
            max_response_bytes: config.max_response_bytes,
        }
    }
}

/// Request/response channel to the child, synchronized on its prompt.
///
/// `reader` is the child's output pipe and `writer` its input pipe. Only one
/// exchange is ever in flight: `submit` writes the request and blocks until
/// the prompt arrives, the stream closes, or the deadline passes.
pub struct DuplexChannel<R, W> {
    reader: R,
    writer: W,
    settings: ProtocolSettings,
    guard: TimeoutGuard,
}

impl<R, W> DuplexChannel<R, W>
where
    R: Read + AsFd,
    W: Write,
{
    pub fn new(reader: R, writer: W, settings: ProtocolSettings) -> Self {
        Self {
            reader,
            writer,
            settings,
            guard: TimeoutGuard::new(),
        }
    }

    /// Whether a response deadline is currently armed.
    pub fn is_waiting(&self) -> bool {
        self.guard.is_armed()
    }

    /// Write a request and wait for the response that precedes the prompt.
    pub fn submit(&mut self, request: &[u8]) -> Result<String, ProtocolError> {
        self.send(request)?;
        let timeout = self.settings.response_timeout;
        self.wait_for_sentinel(timeout)
    }

    /// Write `bytes` in full to the child's input pipe.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
            .map_err(|err| match err.kind() {
                io::ErrorKind::BrokenPipe => ProtocolError::StreamClosed,
                _ => ProtocolError::Io(err),
            })
    }

    /// Read until the prompt appears and return everything before it.
    ///
    /// Bytes that arrive after the prompt within the same read are dropped.
    pub fn wait_for_sentinel(&mut self, timeout: Duration) -> Result<String, ProtocolError> {
        let Self {
            reader,
            settings,
            guard,
            ..
        } = self;

        guard.arm(timeout);
        let guard = scopeguard::guard(guard, |guard| guard.disarm());

        let mut scanner = SentinelScanner::new(settings.sentinel.clone());
        let mut chunk = vec![0u8; settings.read_chunk_bytes];

        loop {
            if guard.wait_readable(reader.as_fd())? == Readiness::TimedOut {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    received = scanner.len(),
                    "calculator prompt did not arrive in time"
                );
                return Err(ProtocolError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            let count = match reader.read(&mut chunk) {
                Ok(count) => count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtocolError::Io(err)),
            };
            if count == 0 {
                tracing::debug!(received = scanner.len(), "calculator output closed");
                return Err(ProtocolError::StreamClosed);
            }

            if let Some(offset) = scanner.feed(&chunk[..count]) {
                let (body, trailing) = scanner.finish(offset);
                if trailing > 0 {
                    tracing::debug!(trailing, "discarded output after prompt");
                }
                return Ok(String::from_utf8_lossy(&body).into_owned());
            }

            if scanner.len() > settings.max_response_bytes {
                return Err(ProtocolError::ResponseTooLarge {
                    limit: settings.max_response_bytes,
                });
            }
        }
    }

    /// Discard output that is already readable without blocking.
    ///
    /// Returns the number of bytes thrown away. Stops at end of stream or
    /// after `max_response_bytes`, leaving the rest for the next wait.
    pub fn drain(&mut self) -> Result<usize, ProtocolError> {
        let mut chunk = vec![0u8; self.settings.read_chunk_bytes];
        let mut discarded = 0;
        while discarded < self.settings.max_response_bytes
            && select_readable(self.reader.as_fd(), Some(Duration::ZERO))?
        {
            match self.reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(count) => discarded += count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtocolError::Io(err)),
            }
        }
        if discarded > 0 {
            tracing::info!(discarded, "drained stale calculator output");
        }
        Ok(discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Instant;

    fn settings(timeout_ms: u64) -> ProtocolSettings {
        ProtocolSettings {
            response_timeout: Duration::from_millis(timeout_ms),
            ..ProtocolSettings::default()
        }
    }

    /// Channel whose peer is the returned stream (plays the child).
    fn channel(timeout_ms: u64) -> (DuplexChannel<UnixStream, UnixStream>, UnixStream) {
        let (ours, child) = UnixStream::pair().unwrap();
        let reader = ours.try_clone().unwrap();
        (DuplexChannel::new(reader, ours, settings(timeout_ms)), child)
    }

    fn read_request(child: &mut UnixStream, len: usize) -> Vec<u8> {
        let mut request = vec![0u8; len];
        child.read_exact(&mut request).unwrap();
        request
    }

    #[test]
    fn returns_text_before_prompt() {
        let (mut channel, mut child) = channel(1000);
        let peer = thread::spawn(move || {
            let request = read_request(&mut child, 4);
            assert_eq!(request, b"2+2\n");
            child.write_all(b"4\n>>> ").unwrap();
            child
        });

        let response = channel.submit(b"2+2\n").unwrap();
        assert_eq!(response, "4\n");
        assert!(!channel.is_waiting());
        peer.join().unwrap();
    }

    #[test]
    fn prompt_split_across_reads_is_one_event() {
        let (mut channel, mut child) = channel(2000);
        let peer = thread::spawn(move || {
            read_request(&mut child, 2);
            child.write_all(b"x\n>>").unwrap();
            thread::sleep(Duration::from_millis(50));
            child.write_all(b"> ").unwrap();
            child
        });

        assert_eq!(channel.submit(b"x\n").unwrap(), "x\n");
        peer.join().unwrap();
    }

    #[test]
    fn timeout_then_next_request_is_unaffected() {
        let (mut channel, mut child) = channel(100);

        let start = Instant::now();
        let err = channel.submit(b"slow\n").unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { timeout_ms: 100 }));
        assert!(start.elapsed() >= Duration::from_millis(95));
        assert!(!channel.is_waiting());

        // Late answer for the first request, then the real one.
        read_request(&mut child, 5);
        let stale = b"stale\n>>> ";
        child.write_all(stale).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(channel.drain().unwrap(), stale.len());
        assert_eq!(channel.drain().unwrap(), 0);

        let peer = thread::spawn(move || {
            read_request(&mut child, 4);
            // Answer well after the earlier deadline would have fired.
            thread::sleep(Duration::from_millis(60));
            child.write_all(b"7\n>>> ").unwrap();
            child
        });
        assert_eq!(channel.submit(b"3+4\n").unwrap(), "7\n");
        peer.join().unwrap();
    }

    #[test]
    fn closed_stream_before_prompt() {
        let (mut channel, child) = channel(1000);
        let peer = thread::spawn(move || {
            let mut child = child;
            read_request(&mut child, 2);
            child.write_all(b"partial").unwrap();
            drop(child);
        });

        let err = channel.submit(b"1\n").unwrap_err();
        assert!(err.is_stream_closed());
        peer.join().unwrap();
    }

    #[test]
    fn oversized_response_is_rejected() {
        let (ours, mut child) = UnixStream::pair().unwrap();
        let reader = ours.try_clone().unwrap();
        let mut channel = DuplexChannel::new(
            reader,
            ours,
            ProtocolSettings {
                read_chunk_bytes: 8,
                max_response_bytes: 16,
                ..settings(1000)
            },
        );
        child.write_all(&[b'9'; 64]).unwrap();

        let err = channel.wait_for_sentinel(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProtocolError::ResponseTooLarge { limit: 16 }));
        assert!(err.leaves_stale_output());
    }

    #[test]
    fn drain_with_nothing_pending_returns_immediately() {
        let (mut channel, _child) = channel(1000);
        assert_eq!(channel.drain().unwrap(), 0);
    }
}
