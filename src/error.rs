//! Error types for cmdlink
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias using CmdlinkError
pub type Result<T> = std::result::Result<T, CmdlinkError>;

/// Unified error type for cmdlink operations
#[derive(Debug, Error)]
pub enum CmdlinkError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid value for flag '{flag}': {reason}")]
    FlagParse { flag: String, reason: String },

    #[error("Handler failed: {0}")]
    Handler(String),

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("Listener error: {0}")]
    Listener(String),

    #[error("Server closed")]
    ServerClosed,

    #[error("Shutdown deadline elapsed with {remaining} active connection(s)")]
    ShutdownTimeout { remaining: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CmdlinkError {
    pub(crate) fn flag_parse(flag: &str, reason: impl Into<String>) -> Self {
        Self::FlagParse {
            flag: flag.to_string(),
            reason: reason.into(),
        }
    }

    /// True once the server stopped accepting because of a shutdown
    pub fn is_server_closed(&self) -> bool {
        matches!(self, Self::ServerClosed)
    }

    /// True when the peer went away (EOF, reset, abort or broken pipe)
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
