//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.
//!
//! ## Shutdown
//! 1. Mark the server as shutting down (new listeners are refused)
//! 2. Close every listener and start the shutdown hooks
//! 3. Wait for every accept loop to return
//! 4. Poll the connection set, closing idle or stalled connections, until
//!    it is empty or the caller's deadline fires
//!
//! A deadline that fires first leaves the remaining connections running;
//! their threads still close them once the handler finishes.

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{after, select, Receiver};
use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use super::backoff::{is_transient_accept_error, AcceptBackoff, PollInterval};
use super::connection::{ConnRecord, Connection};
use super::state::ConnState;
use crate::command::CommandRegistry;
use crate::config::Config;
use crate::error::{CmdlinkError, Result};

type ShutdownHook = Arc<dyn Fn() + Send + Sync>;

/// TCP server for cmdlink
///
/// Cheap to clone; every clone controls the same server, so one thread can
/// run [`Server::serve`] while another calls [`Server::shutdown`].
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

struct Shared {
    config: Config,
    registry: Arc<CommandRegistry>,

    /// Read without the lock on every accept error and listener registration
    in_shutdown: AtomicBool,

    next_id: AtomicU64,

    /// Listener set, connection set and hooks; one lock for all three
    tracked: Mutex<Tracked>,
}

struct Tracked {
    listeners: HashMap<u64, Arc<TrackedListener>>,
    conns: HashMap<u64, Arc<ConnRecord>>,
    on_shutdown: Vec<ShutdownHook>,

    /// Every running accept loop holds a clone
    listener_group: WaitGroup,
}

impl Tracked {
    fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            conns: HashMap::new(),
            on_shutdown: Vec::new(),
            listener_group: WaitGroup::new(),
        }
    }
}

impl Server {
    /// Create a new server with the given config and command registry
    pub fn new(config: Config, registry: Arc<CommandRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry,
                in_shutdown: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                tracked: Mutex::new(Tracked::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.shared.registry
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.in_shutdown.load(Ordering::SeqCst)
    }

    /// Number of tracked (not yet closed) connections
    pub fn active_connections(&self) -> usize {
        self.shared.tracked.lock().conns.len()
    }

    /// Number of running accept loops
    pub fn active_listeners(&self) -> usize {
        self.shared.tracked.lock().listeners.len()
    }

    /// Run `hook` on its own thread when shutdown begins
    pub fn register_on_shutdown<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.tracked.lock().on_shutdown.push(Arc::new(hook));
    }

    // =========================================================================
    // Accepting
    // =========================================================================

    /// Bind the configured address and serve on it (blocking)
    pub fn listen_and_serve(&self) -> Result<()> {
        if self.is_shutting_down() {
            return Err(CmdlinkError::ServerClosed);
        }
        self.shared.config.validate()?;

        let addr = &self.shared.config.listen_addr;
        let listener = TcpListener::bind(addr.as_str())
            .map_err(|e| CmdlinkError::Listener(format!("failed to bind {}: {}", addr, e)))?;
        self.serve(listener)
    }

    /// Accept connections on `listener` until shutdown (blocking)
    ///
    /// Always returns an error: `ServerClosed` after a shutdown, otherwise
    /// the accept failure that stopped the loop. Transient accept errors are
    /// retried with a doubling delay (5ms up to 1s).
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().ok();
        listener.set_nonblocking(true).map_err(|e| {
            CmdlinkError::Listener(format!("failed to enable non-blocking accept: {}", e))
        })?;

        let listener = Arc::new(TrackedListener::new(listener));
        let Some(_guard) = self.track_listener(&listener) else {
            return Err(CmdlinkError::ServerClosed);
        };

        match local_addr {
            Some(addr) => tracing::info!("Listening on {}", addr),
            None => tracing::info!("Listening"),
        }

        let poll = self.shared.config.accept_poll_interval();
        let mut backoff = AcceptBackoff::new();

        loop {
            // None once shutdown closed the listener
            let Some(accepted) = listener.accept() else {
                return Err(CmdlinkError::ServerClosed);
            };

            match accepted {
                Ok((stream, peer)) => {
                    backoff.reset();
                    self.spawn_connection(stream, peer);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(e) => {
                    if self.is_shutting_down() {
                        return Err(CmdlinkError::ServerClosed);
                    }
                    if !is_transient_accept_error(&e) {
                        tracing::warn!("Accept failed, stopping listener: {}", e);
                        return Err(CmdlinkError::Listener(format!("accept failed: {}", e)));
                    }
                    let delay = backoff.next_delay();
                    tracing::warn!("Accept error: {}; retrying in {:?}", e, delay);
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Add a listener to the tracked set, unless shutdown already began
    fn track_listener(&self, listener: &Arc<TrackedListener>) -> Option<ListenerGuard> {
        let mut tracked = self.shared.tracked.lock();
        if self.is_shutting_down() {
            return None;
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        tracked.listeners.insert(id, Arc::clone(listener));

        Some(ListenerGuard {
            shared: Arc::clone(&self.shared),
            id,
            listener: Arc::clone(listener),
            _group: tracked.listener_group.clone(),
        })
    }

    /// Track an accepted connection and serve it on its own thread
    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let socket = match stream
            .set_nonblocking(false)
            .and_then(|_| stream.try_clone())
        {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!("Dropping connection from {}: {}", peer, e);
                return;
            }
        };

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(ConnRecord::new(id, peer.to_string(), socket));
        record.state.set(ConnState::New);
        self.shared
            .tracked
            .lock()
            .conns
            .insert(id, Arc::clone(&record));

        let guard = ConnGuard {
            shared: Arc::clone(&self.shared),
            record: Arc::clone(&record),
        };
        let registry = Arc::clone(&self.shared.registry);
        let config = &self.shared.config;
        let (read_timeout, write_timeout) = (config.read_timeout(), config.write_timeout());
        let max_frame_size = config.max_frame_size;

        let spawned = thread::Builder::new()
            .name(format!("cmdlink-conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, registry, record, max_frame_size)
                    .and_then(|mut conn| {
                        conn.set_timeouts(read_timeout, write_timeout)?;
                        conn.handle()
                    });
                if let Err(e) = result {
                    tracing::debug!("Connection {} ended with error: {}", id, e);
                }
            });

        // On failure the closure, and with it the guard, is dropped and untracks the connection
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn connection thread for {}: {}", peer, e);
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Gracefully shut down, giving up after `timeout`
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let deadline = after(timeout);
        self.shutdown_with(&deadline)
    }

    /// Gracefully shut down until `cancel` yields a message or disconnects
    ///
    /// Returns the first listener-close error on a clean drain, or
    /// `ShutdownTimeout` if `cancel` fires while connections remain.
    pub fn shutdown_with<T>(&self, cancel: &Receiver<T>) -> Result<()> {
        self.shared.in_shutdown.store(true, Ordering::SeqCst);
        tracing::info!("Shutting down");

        let (listener_result, hooks, listener_group) = {
            let mut tracked = self.shared.tracked.lock();
            let result = close_listeners_locked(&tracked);
            let hooks = tracked.on_shutdown.clone();
            let group = std::mem::replace(&mut tracked.listener_group, WaitGroup::new());
            (result, hooks, group)
        };

        for hook in hooks {
            if let Err(e) = thread::Builder::new()
                .name("cmdlink-shutdown-hook".to_string())
                .spawn(move || hook())
            {
                tracing::warn!("Failed to spawn shutdown hook: {}", e);
            }
        }

        listener_group.wait();
        tracing::debug!("All listeners stopped");

        let mut poll = PollInterval::new();
        loop {
            if self.close_idle_conns() {
                tracing::info!("Shutdown complete");
                return listener_result;
            }

            let wait = poll.next_interval();
            select! {
                recv(cancel) -> _ => {
                    let remaining = self.active_connections();
                    tracing::warn!(
                        "Shutdown deadline reached, abandoning {} active connection(s)",
                        remaining
                    );
                    return Err(CmdlinkError::ShutdownTimeout { remaining });
                }
                recv(after(wait)) -> _ => {}
            }
        }
    }

    /// Close idle (and stalled `New`) connections; true once none remain
    fn close_idle_conns(&self) -> bool {
        let now = Instant::now();
        let stalled_after = self.shared.config.stalled_conn_after();

        let mut tracked = self.shared.tracked.lock();
        tracked.conns.retain(|_, record| {
            if !record.state.is_idle_for_shutdown(now, stalled_after) {
                return true;
            }
            tracing::debug!("Closing idle connection {} ({})", record.id, record.peer_addr);
            record.force_close();
            false
        });
        tracked.conns.is_empty()
    }
}

/// Close every tracked listener, keeping the first error
fn close_listeners_locked(tracked: &Tracked) -> Result<()> {
    let mut first_err = None;
    for listener in tracked.listeners.values() {
        if let Err(e) = listener.close() {
            tracing::warn!("Error closing listener {:?}: {}", listener.local_addr, e);
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(CmdlinkError::Listener(format!("failed to close listener: {}", e))),
        None => Ok(()),
    }
}

// =============================================================================
// Tracking helpers
// =============================================================================

/// A listener that can be closed exactly once from any thread
struct TrackedListener {
    local_addr: Option<SocketAddr>,
    socket: Mutex<Option<TcpListener>>,
}

impl TrackedListener {
    fn new(listener: TcpListener) -> Self {
        Self {
            local_addr: listener.local_addr().ok(),
            socket: Mutex::new(Some(listener)),
        }
    }

    /// Non-blocking accept; `None` once closed
    fn accept(&self) -> Option<io::Result<(TcpStream, SocketAddr)>> {
        self.socket.lock().as_ref().map(TcpListener::accept)
    }

    /// Drop the socket, reporting any error pending on it
    fn close(&self) -> io::Result<()> {
        let Some(listener) = self.socket.lock().take() else {
            return Ok(());
        };
        match listener.take_error() {
            Ok(None) => Ok(()),
            Ok(Some(e)) | Err(e) => Err(e),
        }
    }
}

/// Untracks a listener when its accept loop returns
struct ListenerGuard {
    shared: Arc<Shared>,
    id: u64,
    listener: Arc<TrackedListener>,
    _group: WaitGroup,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let _ = self.listener.close();
        self.shared.tracked.lock().listeners.remove(&self.id);
        tracing::info!("Listener {:?} stopped", self.listener.local_addr);
    }
}

/// Marks a connection closed and untracks it when its thread exits,
/// including by panic
struct ConnGuard {
    shared: Arc<Shared>,
    record: Arc<ConnRecord>,
}

impl Drop for ConnGuard {
    fn drop(&mut self) {
        self.record.state.set(ConnState::Closed);
        self.record.force_close();
        self.shared.tracked.lock().conns.remove(&self.record.id);
        tracing::debug!("Connection {} closed", self.record.id);
    }
}

#[cfg(test)]
impl Server {
    /// Track a socket as if it had been accepted, with an explicit state
    pub(crate) fn track_for_test(
        &self,
        stream: TcpStream,
        state: Option<(ConnState, Instant)>,
    ) -> u64 {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(ConnRecord::new(id, "test".to_string(), stream));
        if let Some((state, at)) = state {
            record.state.set_at(state, at);
        }
        self.shared.tracked.lock().conns.insert(id, record);
        id
    }

    pub(crate) fn untrack_for_test(&self, id: u64) {
        self.shared.tracked.lock().conns.remove(&id);
    }
}
