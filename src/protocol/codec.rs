//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Frame
//! ```text
//! ┌──────────┬─────────────────────────────────────────┐
//! │ Len (4)  │         Payload (Len bytes)             │
//! └──────────┴─────────────────────────────────────────┘
//! ```
//!
//! ### Payload
//! ```text
//! name:lpstring  { flag:lpstring  count:u32  lpstring * count } *
//! lpstring := len:u32 bytes[len]
//! ```
//!
//! The flag section has no pair count; pairs are read until the payload is
//! exhausted. All integers are big-endian.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::WireMessage;
use crate::error::{CmdlinkError, Result};

/// Size of every length prefix (frame, string, value count)
pub const LEN_PREFIX_SIZE: usize = 4;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a message payload (no frame length prefix)
pub fn encode_message(message: &WireMessage) -> Vec<u8> {
    let mut payload = Vec::with_capacity(encoded_len(message));

    put_string(&mut payload, &message.name);
    for (flag, values) in &message.flags {
        put_string(&mut payload, flag);
        payload.put_u32(values.len() as u32);
        for value in values {
            put_string(&mut payload, value);
        }
    }

    payload
}

/// Encode a message as a complete frame
///
/// Format: payload_len (4) + payload
pub fn encode_frame(message: &WireMessage) -> Vec<u8> {
    let payload = encode_message(message);

    let mut frame = Vec::with_capacity(LEN_PREFIX_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.extend_from_slice(&payload);

    frame
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

/// Exact payload size of an encoded message
fn encoded_len(message: &WireMessage) -> usize {
    let flags: usize = message
        .flags
        .iter()
        .map(|(flag, values)| {
            2 * LEN_PREFIX_SIZE
                + flag.len()
                + values.iter().map(|v| LEN_PREFIX_SIZE + v.len()).sum::<usize>()
        })
        .sum();
    LEN_PREFIX_SIZE + message.name.len() + flags
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a message payload
///
/// Reads the command name, then (flag, values) pairs until the payload is
/// exhausted. A repeated flag name replaces the earlier values.
pub fn decode_message(payload: &[u8]) -> Result<WireMessage> {
    let mut buf = payload;

    let name = read_string(&mut buf, "command name")?;
    let mut message = WireMessage::new(name);

    while buf.has_remaining() {
        let flag = read_string(&mut buf, "flag name")?;
        let values = read_string_list(&mut buf, &flag)?;
        message.flags.insert(flag, values);
    }

    Ok(message)
}

/// Decode a complete frame held in memory
///
/// Unlike [`decode_message`], the declared length must match the bytes that
/// follow it exactly; both truncated and padded frames are rejected.
pub fn decode_frame(frame: &[u8]) -> Result<WireMessage> {
    let mut buf = frame;
    let declared = read_u32(&mut buf, "frame length")? as usize;

    if declared != buf.remaining() {
        return Err(CmdlinkError::Decode(format!(
            "frame length mismatch: header declares {} bytes, {} present",
            declared,
            buf.remaining()
        )));
    }

    decode_message(buf)
}

fn read_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    if buf.remaining() < LEN_PREFIX_SIZE {
        return Err(CmdlinkError::Decode(format!(
            "{}: need {} bytes for length prefix, {} left",
            what,
            LEN_PREFIX_SIZE,
            buf.remaining()
        )));
    }
    Ok(buf.get_u32())
}

fn read_string(buf: &mut &[u8], what: &str) -> Result<String> {
    let len = read_u32(buf, what)? as usize;

    if len > buf.remaining() {
        return Err(CmdlinkError::Decode(format!(
            "{}: length {} exceeds remaining {} bytes",
            what,
            len,
            buf.remaining()
        )));
    }

    let current: &[u8] = *buf;
    let (bytes, rest) = current.split_at(len);
    *buf = rest;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| CmdlinkError::Decode(format!("{}: invalid UTF-8: {}", what, e)))
}

fn read_string_list(buf: &mut &[u8], flag: &str) -> Result<Vec<String>> {
    let count = read_u32(buf, flag)? as usize;

    // Every value needs at least its prefix, so a lying count can't force a huge allocation
    let mut values = Vec::with_capacity(count.min(buf.remaining() / LEN_PREFIX_SIZE));
    for _ in 0..count {
        values.push(read_string(buf, flag)?);
    }

    Ok(values)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read the 4-byte frame length from a stream
pub fn read_frame_len<R: Read>(reader: &mut R) -> Result<usize> {
    let mut header = [0u8; LEN_PREFIX_SIZE];
    reader.read_exact(&mut header)?;
    Ok(u32::from_be_bytes(header) as usize)
}

/// Read exactly `len` payload bytes, refusing frames larger than `max_len`
pub fn read_payload<R: Read>(reader: &mut R, len: usize, max_len: usize) -> Result<Vec<u8>> {
    if len > max_len {
        return Err(CmdlinkError::FrameTooLarge {
            size: len,
            max: max_len,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Read one complete frame payload from a stream
///
/// Blocks until the whole frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let len = read_frame_len(reader)?;
    read_payload(reader, len, max_len)
}

/// Read and decode one message from a stream
pub fn read_message<R: Read>(reader: &mut R, max_len: usize) -> Result<WireMessage> {
    let payload = read_frame(reader, max_len)?;
    decode_message(&payload)
}

/// Write a message as one frame
pub fn write_frame<W: Write>(writer: &mut W, message: &WireMessage) -> Result<()> {
    let bytes = encode_frame(message);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
