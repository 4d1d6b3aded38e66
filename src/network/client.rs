//! Blocking client
//!
//! Sends one framed request per connection and reads the raw response until
//! the server closes the socket.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CmdlinkError, Result};
use crate::protocol::{encode_frame, WireMessage};

/// Client for a cmdlink server
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send `message` and return everything the server wrote back
    ///
    /// Error responses come back as bytes like any other; use
    /// [`Client::call_checked`] to turn them into errors.
    pub fn call(&self, message: &WireMessage) -> Result<Vec<u8>> {
        let mut stream = self.connect()?;

        stream.write_all(&encode_frame(message))?;
        stream.flush()?;
        // Half-close so the server sees the end of the request
        stream.shutdown(Shutdown::Write)?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response)?;

        tracing::debug!(
            "'{}' returned {} bytes from {}",
            message.name,
            response.len(),
            self.addr
        );
        Ok(response)
    }

    /// Like [`Client::call`], but a response starting with `error: ` becomes
    /// a `Handler` error carrying the server's message
    pub fn call_checked(&self, message: &WireMessage) -> Result<Vec<u8>> {
        let response = self.call(message)?;
        match response.strip_prefix(b"error: ") {
            Some(rest) => {
                let text = String::from_utf8_lossy(rest);
                Err(CmdlinkError::Handler(text.trim_end().to_string()))
            }
            None => Ok(response),
        }
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| CmdlinkError::Config(format!("invalid address '{}': {}", self.addr, e)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(self.read_timeout)?;
                    stream.set_write_timeout(self.write_timeout)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(e) => CmdlinkError::Io(e),
            None => CmdlinkError::Config(format!("address '{}' resolved to nothing", self.addr)),
        })
    }
}
