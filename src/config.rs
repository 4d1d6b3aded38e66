//! Configuration for cmdlink
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{CmdlinkError, Result};

/// Environment variable holding the listen/dial address
pub const ADDRESS_ENV_VAR: &str = "CMD_ADDRESS";

/// Address used when `CMD_ADDRESS` is unset or empty
pub const DEFAULT_ADDRESS: &str = "localhost:51005";

/// Resolve the command address from the environment
///
/// Returns `$CMD_ADDRESS` when set and non-empty, otherwise [`DEFAULT_ADDRESS`].
pub fn resolve_address() -> String {
    match std::env::var(ADDRESS_ENV_VAR) {
        Ok(addr) if !addr.is_empty() => addr,
        _ => DEFAULT_ADDRESS.to_string(),
    }
}

/// Main configuration for a cmdlink server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// How long the accept loop sleeps when no connection is pending (milliseconds)
    pub accept_poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest frame payload accepted from a client (in bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Shutdown Configuration
    // -------------------------------------------------------------------------
    /// A connection still `New` after this many seconds counts as idle during shutdown
    pub stalled_conn_secs: u64,

    /// Deadline for graceful shutdown (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDRESS.to_string(),
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            accept_poll_interval_ms: 10,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            stalled_conn_secs: 5,
            shutdown_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Default config listening on the address resolved from the environment
    pub fn from_env() -> Self {
        Self {
            listen_addr: resolve_address(),
            ..Self::default()
        }
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(CmdlinkError::Config("listen address is empty".to_string()));
        }
        if self.max_frame_size < 4 {
            return Err(CmdlinkError::Config(format!(
                "max_frame_size must be at least 4 bytes, got {}",
                self.max_frame_size
            )));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms.max(1))
    }

    pub fn stalled_conn_after(&self) -> Duration {
        Duration::from_secs(self.stalled_conn_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the accept poll interval (in milliseconds)
    pub fn accept_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_interval_ms = ms;
        self
    }

    /// Set the maximum frame payload size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set how long a `New` connection may stall before shutdown treats it as idle
    pub fn stalled_conn_secs(mut self, secs: u64) -> Self {
        self.config.stalled_conn_secs = secs;
        self
    }

    /// Set the graceful shutdown deadline (in milliseconds)
    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
