use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

/// Result of waiting for the child's output pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Data (or end of stream) is available; a read will not block.
    Ready,
    /// The armed deadline passed first.
    TimedOut,
}

/// Deadline around the blocking reads of a single response wait.
///
/// The guard only ever holds one deadline. `arm` replaces any previous one
/// and `disarm` clears it, so a wait that ends early cannot leave a deadline
/// behind for the next, unrelated wait.
#[derive(Debug, Default)]
pub struct TimeoutGuard {
    deadline: Option<Instant>,
    armed_for: Duration,
}

impl TimeoutGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
        self.armed_for = duration;
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Duration passed to the most recent `arm`.
    pub fn armed_for(&self) -> Duration {
        self.armed_for
    }

    /// Time left before the deadline, `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Block until `fd` is readable or the armed deadline passes.
    ///
    /// A disarmed guard waits without limit.
    pub fn wait_readable(&self, fd: BorrowedFd<'_>) -> io::Result<Readiness> {
        loop {
            let remaining = self.remaining();
            if remaining == Some(Duration::ZERO) {
                return Ok(Readiness::TimedOut);
            }
            match select_readable(fd, remaining) {
                Ok(true) => return Ok(Readiness::Ready),
                // select timed out; loop to re-check the deadline against the clock
                Ok(false) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Wait for readability using `select()`.
///
/// `None` blocks indefinitely; `Some(Duration::ZERO)` polls.
pub fn select_readable(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> io::Result<bool> {
    let fd = fd.as_raw_fd();
    if fd < 0 || fd as usize >= libc::FD_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "file descriptor out of range for select()",
        ));
    }
    unsafe {
        let mut read_fds: libc::fd_set = std::mem::zeroed();
        libc::FD_ZERO(&mut read_fds);
        libc::FD_SET(fd, &mut read_fds);

        let mut tv = timeout.map(|timeout| libc::timeval {
            tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        });
        let tv_ptr = match tv.as_mut() {
            Some(tv) => tv as *mut libc::timeval,
            None => std::ptr::null_mut(),
        };

        let ret = libc::select(
            fd + 1,
            &mut read_fds,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            tv_ptr,
        );
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret > 0)
    }
}
