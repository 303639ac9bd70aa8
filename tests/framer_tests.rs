//! Framer Tests
//!
//! Tests for pulling complete frames off a byte stream.

use std::io::{self, Cursor, Read};

use bytes::Bytes;
use tinyrpc::protocol::{
    decode_request, encode_request, read_frame, write_frame, Request, MAX_FRAME_SIZE,
};
use tinyrpc::RpcError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Reader that hands out at most one byte per call
struct Trickle<'a> {
    data: &'a [u8],
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[0];
        self.data = &self.data[1..];
        Ok(1)
    }
}

fn frame(service: &str, data: &[u8]) -> Bytes {
    let req = Request::new(service, "Method", 1, data.to_vec());
    encode_request(&req).unwrap()
}

fn prefix(head: u32, body: u32) -> Vec<u8> {
    let mut bytes = head.to_be_bytes().to_vec();
    bytes.extend_from_slice(&body.to_be_bytes());
    bytes
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_single_frame() {
    let encoded = frame("svc", b"payload");
    let mut cursor = Cursor::new(encoded.to_vec());

    let read = read_frame(&mut cursor).unwrap();
    assert_eq!(read, encoded);
}

#[test]
fn test_read_back_to_back_frames() {
    let first = frame("first", b"one");
    let second = frame("second", b"");

    let mut stream = first.to_vec();
    stream.extend_from_slice(&second);
    let mut cursor = Cursor::new(stream);

    assert_eq!(read_frame(&mut cursor).unwrap(), first);
    assert_eq!(read_frame(&mut cursor).unwrap(), second);

    // Nothing left
    match read_frame(&mut cursor) {
        Err(RpcError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

#[test]
fn test_read_frame_delivered_one_byte_at_a_time() {
    let encoded = frame("user-service", b"{\"id\":123}");
    let mut reader = Trickle { data: &encoded[..] };

    let read = read_frame(&mut reader).unwrap();
    let req = decode_request(&read).unwrap();
    assert_eq!(req.service_name, "user-service");
    assert_eq!(req.data, &b"{\"id\":123}"[..]);
}

#[test]
fn test_read_frame_eof_mid_prefix() {
    let mut cursor = Cursor::new(vec![0u8, 0, 0]);
    match read_frame(&mut cursor) {
        Err(RpcError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

#[test]
fn test_read_frame_eof_mid_body() {
    let encoded = frame("svc", b"a fairly long payload");
    let mut cursor = Cursor::new(encoded[..encoded.len() - 5].to_vec());

    match read_frame(&mut cursor) {
        Err(RpcError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

#[test]
fn test_read_frame_rejects_short_head() {
    let mut bytes = prefix(8, 0);
    bytes.extend_from_slice(&[0u8; 16]);
    let mut cursor = Cursor::new(bytes);

    assert!(matches!(read_frame(&mut cursor), Err(RpcError::Decode(_))));
}

#[test]
fn test_read_frame_rejects_oversized_frame() {
    let mut cursor = Cursor::new(prefix(15, MAX_FRAME_SIZE as u32));
    assert!(matches!(read_frame(&mut cursor), Err(RpcError::Decode(_))));
}

#[test]
fn test_read_frame_does_not_interpret_contents() {
    // Garbage after a valid prefix is still one frame; the codec rejects it later
    let mut bytes = prefix(15, 2);
    bytes.extend_from_slice(&[0xAA; 9]);
    let mut cursor = Cursor::new(bytes);

    let read = read_frame(&mut cursor).unwrap();
    assert_eq!(read.len(), 17);
    assert!(decode_request(&read).is_err());
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_write_then_read() {
    let encoded = frame("svc", b"data");
    let mut out = Vec::new();
    write_frame(&mut out, &encoded).unwrap();
    write_frame(&mut out, &encoded).unwrap();

    let mut cursor = Cursor::new(out);
    assert_eq!(read_frame(&mut cursor).unwrap(), encoded);
    assert_eq!(read_frame(&mut cursor).unwrap(), encoded);
}
