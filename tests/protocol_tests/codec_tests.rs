//! Codec Tests
//!
//! Tests for message and frame encoding/decoding.

use std::io::Cursor;

use cmdlink::protocol::{
    decode_frame, decode_message, encode_frame, encode_message, read_message, write_frame,
    WireMessage, MAX_PAYLOAD_SIZE,
};
use cmdlink::CmdlinkError;

// =============================================================================
// Byte Layout Tests
// =============================================================================

#[test]
fn test_command_without_flags_layout() {
    let payload = encode_message(&WireMessage::new("asd"));
    assert_eq!(payload, [0, 0, 0, 3, b'a', b's', b'd']);
}

#[test]
fn test_flag_value_list_layout() {
    let msg = WireMessage::new("").with_flag("x", ["asd", "asd2"]);
    let payload = encode_message(&msg);

    let mut expected = vec![0, 0, 0, 0]; // empty name
    expected.extend_from_slice(&[0, 0, 0, 1, b'x']);
    expected.extend_from_slice(&[
        0, 0, 0, 2, 0, 0, 0, 3, b'a', b's', b'd', 0, 0, 0, 4, b'a', b's', b'd', b'2',
    ]);
    assert_eq!(payload, expected);
}

#[test]
fn test_frame_prefix_is_payload_length() {
    let msg = WireMessage::new("echo").with_flag("msg", ["hi"]);
    let frame = encode_frame(&msg);
    let payload_len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

    assert_eq!(payload_len, frame.len() - 4);
    assert_eq!(&frame[4..], encode_message(&msg).as_slice());
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_with_flags() {
    let msg = WireMessage::new("deploy")
        .with_flag("env", ["prod"])
        .with_flag("hosts", ["a", "b", "c"])
        .with_flag("dry-run", Vec::<String>::new());

    let decoded = decode_frame(&encode_frame(&msg)).unwrap();

    assert_eq!(decoded, msg);
    assert_eq!(decoded.values("hosts"), ["a", "b", "c"]);
    assert!(decoded.values("dry-run").is_empty());
}

#[test]
fn test_decode_unicode_strings() {
    let msg = WireMessage::new("grüß").with_flag("ключ", ["値"]);
    let decoded = decode_message(&encode_message(&msg)).unwrap();
    assert_eq!(decoded.name, "grüß");
    assert_eq!(decoded.values("ключ"), ["値"]);
}

#[test]
fn test_decode_empty_payload_fails() {
    assert!(matches!(decode_message(&[]), Err(CmdlinkError::Decode(_))));
}

#[test]
fn test_decode_truncated_name_fails() {
    // Declares 5 bytes, carries 3
    let payload = [0, 0, 0, 5, b'a', b'b', b'c'];
    assert!(matches!(
        decode_message(&payload),
        Err(CmdlinkError::Decode(_))
    ));
}

#[test]
fn test_decode_truncated_value_list_fails() {
    let msg = WireMessage::new("cmd").with_flag("xs", ["one", "two"]);
    let payload = encode_message(&msg);

    for cut in 8..payload.len() {
        assert!(
            decode_message(&payload[..cut]).is_err(),
            "payload cut at {} should not decode",
            cut
        );
    }
}

#[test]
fn test_decode_invalid_utf8_fails() {
    let payload = [0, 0, 0, 2, 0xff, 0xfe];
    assert!(matches!(
        decode_message(&payload),
        Err(CmdlinkError::Decode(_))
    ));
}

#[test]
fn test_repeated_flag_keeps_last_values() {
    let mut payload = encode_message(&WireMessage::new("cmd").with_flag("a", ["1"]));
    payload.extend_from_slice(&[0, 0, 0, 1, b'a', 0, 0, 0, 1, 0, 0, 0, 1, b'2']);

    let decoded = decode_message(&payload).unwrap();
    assert_eq!(decoded.values("a"), ["2"]);
}

#[test]
fn test_decode_frame_rejects_short_and_padded_frames() {
    let frame = encode_frame(&WireMessage::new("cmd"));

    let short = &frame[..frame.len() - 1];
    assert!(matches!(decode_frame(short), Err(CmdlinkError::Decode(_))));

    let mut padded = frame.clone();
    padded.push(0);
    assert!(matches!(decode_frame(&padded), Err(CmdlinkError::Decode(_))));

    assert!(matches!(decode_frame(&[0, 0]), Err(CmdlinkError::Decode(_))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_write_read_message() {
    let msg = WireMessage::new("sum").with_flag("xs", ["1", "2", "3"]);

    let mut buffer = Vec::new();
    write_frame(&mut buffer, &msg).unwrap();

    let mut cursor = Cursor::new(buffer);
    let decoded = read_message(&mut cursor, MAX_PAYLOAD_SIZE).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn test_stream_oversized_frame_rejected() {
    let msg = WireMessage::new("x".repeat(64));
    let mut cursor = Cursor::new(encode_frame(&msg));

    match read_message(&mut cursor, 16) {
        Err(CmdlinkError::FrameTooLarge { size, max }) => {
            assert_eq!(size, 68);
            assert_eq!(max, 16);
        }
        other => panic!("Expected FrameTooLarge, got {:?}", other),
    }
}

#[test]
fn test_stream_eof_mid_frame_is_disconnect() {
    let frame = encode_frame(&WireMessage::new("cmd"));
    let mut cursor = Cursor::new(frame[..frame.len() - 2].to_vec());

    let err = read_message(&mut cursor, MAX_PAYLOAD_SIZE).unwrap_err();
    assert!(err.is_disconnect());
}
