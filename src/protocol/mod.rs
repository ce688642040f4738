//! Prompt-synchronized request/response protocol.
//!
//! ```text
//! send(request) → wait_readable(deadline) → read → scan for prompt → response
//! ```

mod channel;
mod sentinel;
mod timeout;

pub use channel::{DuplexChannel, ProtocolError, ProtocolSettings};
pub use sentinel::SentinelScanner;
pub use timeout::{select_readable, Readiness, TimeoutGuard};
