//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use super::state::{ConnState, StateCell};
use crate::command::CommandRegistry;
use crate::error::{CmdlinkError, Result};
use crate::protocol::{decode_message, read_frame_len, read_payload, WireMessage};

/// Server-side record of one accepted connection
///
/// Holds a second handle to the socket so shutdown can close it while the
/// connection thread is still blocked on it.
#[derive(Debug)]
pub(crate) struct ConnRecord {
    pub(crate) id: u64,
    pub(crate) peer_addr: String,
    pub(crate) state: StateCell,
    socket: TcpStream,
}

impl ConnRecord {
    pub(crate) fn new(id: u64, peer_addr: String, socket: TcpStream) -> Self {
        Self {
            id,
            peer_addr,
            state: StateCell::new(),
            socket,
        }
    }

    /// Shut down both directions of the socket
    pub(crate) fn force_close(&self) {
        if let Err(e) = self.socket.shutdown(Shutdown::Both) {
            if e.kind() != ErrorKind::NotConnected {
                tracing::debug!("Closing connection {} ({}): {}", self.id, self.peer_addr, e);
            }
        }
    }
}

/// Handles a single client connection
pub(crate) struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Commands this connection can dispatch to
    registry: Arc<CommandRegistry>,

    /// Lifecycle state shared with the server's connection set
    record: Arc<ConnRecord>,

    /// Largest accepted frame payload
    max_frame_size: usize,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub(crate) fn new(
        stream: TcpStream,
        registry: Arc<CommandRegistry>,
        record: Arc<ConnRecord>,
        max_frame_size: usize,
    ) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            registry,
            record,
            max_frame_size,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    /// Handle the connection: one request, one response
    ///
    /// Failures to decode, resolve or run the command are reported to the
    /// client as an `error: ...` line and returned; a client that simply
    /// went away is not an error.
    pub fn handle(&mut self) -> Result<()> {
        let peer = self.record.peer_addr.clone();
        tracing::debug!("Connection established from {}", peer);

        let message = match self.read_request() {
            Ok(message) => message,
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} disconnected before sending a request", peer);
                return Ok(());
            }
            Err(CmdlinkError::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                tracing::debug!("Read timeout for client {}", peer);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Bad request from {}: {}", peer, e);
                self.send_error(&e);
                return Err(e);
            }
        };

        tracing::trace!("Received request from {}: {:?}", peer, message);

        let result = self.registry.dispatch(&message, &mut self.writer);
        if let Err(ref e) = result {
            tracing::warn!("Command '{}' from {} failed: {}", message.name, peer, e);
            self.send_error(e);
        }

        if let Err(e) = self.writer.flush() {
            let e = CmdlinkError::from(e);
            if e.is_disconnect() {
                tracing::debug!("Client {} disconnected before response could be sent", peer);
                return result;
            }
            tracing::warn!("Error writing to {}: {}", peer, e);
            return result.and(Err(e));
        }

        result
    }

    /// Read one frame and decode it; the connection turns `Active` once the
    /// frame length has arrived
    fn read_request(&mut self) -> Result<WireMessage> {
        let len = read_frame_len(&mut self.reader)?;
        self.record.state.set(ConnState::Active);

        let payload = read_payload(&mut self.reader, len, self.max_frame_size)?;
        decode_message(&payload)
    }

    /// Best-effort error line to the client
    fn send_error(&mut self, error: &CmdlinkError) {
        let _ = writeln!(self.writer, "error: {}", error);
        let _ = self.writer.flush();
    }
}
