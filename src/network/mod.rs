//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One accept loop per listener, polling a non-blocking socket
//! - One thread per accepted connection, one request per connection
//! - Requests routed through the [`CommandRegistry`](crate::command::CommandRegistry)
//! - Graceful shutdown drains connections, bounded by a deadline

mod backoff;
mod client;
mod connection;
mod server;
mod state;

pub use backoff::{AcceptBackoff, PollInterval};
pub use client::Client;
pub use server::Server;
pub use state::ConnState;
