//! # cmdlink
//!
//! A small remote-command framework:
//! - Length-prefixed binary protocol for command requests
//! - Command registry with typed, defaultable flags
//! - Thread-per-connection TCP server with graceful shutdown
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │        (accept loop, connection tracking, shutdown)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one frame per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Protocol Codec                            │
//! │            (frame ──► WireMessage)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Command Registry                            │
//! │     (lookup ──► FlagExtractor ──► handler writes reply)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod command;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CmdlinkError, Result};
pub use config::Config;
pub use command::{CommandDescriptor, CommandRegistry, FlagExtractor};
pub use protocol::WireMessage;
pub use network::{Client, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cmdlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
