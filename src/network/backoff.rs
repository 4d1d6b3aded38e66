//! Retry and poll intervals for the accept loop and shutdown drain

use std::io;
use std::time::Duration;

use rand::Rng;

/// First delay after a transient accept error
pub const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(5);

/// Longest delay between accept retries
pub const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// First shutdown poll interval (before jitter)
pub const SHUTDOWN_POLL_START: Duration = Duration::from_millis(1);

/// Longest shutdown poll interval (before jitter)
pub const SHUTDOWN_POLL_MAX: Duration = Duration::from_millis(500);

/// Doubling delay for consecutive transient accept failures
///
/// 5ms, 10ms, 20ms, ... capped at 1s. A successful accept resets it.
#[derive(Debug, Default, Clone)]
pub struct AcceptBackoff {
    delay: Option<Duration>,
}

impl AcceptBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay to wait before the next retry
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.delay {
            None => ACCEPT_BACKOFF_START,
            Some(delay) => (delay * 2).min(ACCEPT_BACKOFF_MAX),
        };
        self.delay = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.delay = None;
    }
}

/// Whether an accept error is worth retrying
///
/// Covers interrupted calls, connections torn down before accept completed,
/// and running out of file descriptors.
pub fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::TimedOut
    ) || is_fd_exhaustion(error)
}

#[cfg(unix)]
fn is_fd_exhaustion(error: &io::Error) -> bool {
    // EMFILE / ENFILE
    matches!(error.raw_os_error(), Some(24) | Some(23))
}

#[cfg(not(unix))]
fn is_fd_exhaustion(_error: &io::Error) -> bool {
    false
}

/// Shutdown drain poll interval: base plus up to 10% jitter, base doubling
/// up to 500ms
#[derive(Debug, Clone)]
pub struct PollInterval {
    base: Duration,
}

impl PollInterval {
    pub fn new() -> Self {
        Self {
            base: SHUTDOWN_POLL_START,
        }
    }

    pub fn next_interval(&mut self) -> Duration {
        let jitter_cap = (self.base / 10).as_nanos() as u64;
        let jitter = if jitter_cap > 0 {
            Duration::from_nanos(rand::thread_rng().gen_range(0..jitter_cap))
        } else {
            Duration::ZERO
        };
        let interval = self.base + jitter;

        self.base = (self.base * 2).min(SHUTDOWN_POLL_MAX);
        interval
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::new()
    }
}
