//! Connection lifecycle state

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Lifecycle state of a tracked connection
///
/// One-shot dispatch only ever moves `New -> Active -> Closed`. `Idle` and
/// `Hijacked` belong to a persistent-connection mode that does not exist
/// yet; shutdown still knows how to classify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnState {
    /// Accepted, no request bytes read yet
    New,
    /// Request being read or handled
    Active,
    /// Between requests on a kept-alive connection
    Idle,
    /// Taken over by its handler; terminal, never becomes `Closed`
    Hijacked,
    /// Terminal
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnState::New => "new",
            ConnState::Active => "active",
            ConnState::Idle => "idle",
            ConnState::Hijacked => "hijacked",
            ConnState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State plus the instant of the last transition
///
/// `since` is `None` until the first transition is recorded.
#[derive(Debug)]
pub(crate) struct StateCell {
    inner: Mutex<(ConnState, Option<Instant>)>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new((ConnState::New, None)),
        }
    }

    pub(crate) fn set(&self, state: ConnState) {
        self.set_at(state, Instant::now());
    }

    pub(crate) fn set_at(&self, state: ConnState, at: Instant) {
        *self.inner.lock() = (state, Some(at));
    }

    pub(crate) fn get(&self) -> (ConnState, Option<Instant>) {
        *self.inner.lock()
    }

    /// Whether shutdown may close this connection now
    ///
    /// `Idle` counts, and so does a `New` connection that has not sent a
    /// request within `stalled_after`. A connection with no recorded
    /// transition is too new to judge.
    pub(crate) fn is_idle_for_shutdown(&self, now: Instant, stalled_after: Duration) -> bool {
        let (state, since) = self.get();
        let Some(since) = since else {
            return false;
        };

        match state {
            ConnState::Idle => true,
            ConnState::New => now.saturating_duration_since(since) > stalled_after,
            _ => false,
        }
    }
}
