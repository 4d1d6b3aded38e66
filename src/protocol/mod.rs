//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! ### Request Frame
//! ```text
//! ┌──────────┬─────────────────────────────────────────┐
//! │ Len (4)  │         Message                          │
//! └──────────┴─────────────────────────────────────────┘
//! ```
//!
//! ### Message
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────┐
//! │ Name (lp)  │ Flag (lp) │ Count (4) │ Value (lp) * Count │ ...  │
//! └────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! `lp` strings are a 4-byte big-endian byte length followed by the raw
//! bytes. One frame is sent per connection.
//!
//! ### Response
//! The command handler writes raw bytes straight to the connection; no
//! framing is applied. Failures are reported as a single `error: ...` line.

mod codec;
mod message;

pub use codec::{
    decode_frame, decode_message, encode_frame, encode_message, read_frame, read_frame_len,
    read_message, read_payload, write_frame, LEN_PREFIX_SIZE, MAX_PAYLOAD_SIZE,
};
pub use message::WireMessage;
