//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Fixed Header (both directions, big-endian)
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────┬──────────┬────────────┐
//! │ Head (4) │ Body (4) │ MsgId (4)│ Ver (1) │ Comp (1) │ Serial (1) │
//! └──────────┴──────────┴──────────┴─────────┴──────────┴────────────┘
//! ```
//!
//! ### Request variable header
//! `service \n method \n (key \r value \n)*`
//!
//! ### Response variable header
//! Raw error bytes, `head_length - 15` of them.
//!
//! The body (`body_length` bytes) follows the head in both directions.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::{Request, Response, FIXED_HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::{Result, RpcError};

/// Separates header fields and terminates meta pairs
pub const SPLITTER: u8 = b'\n';

/// Separates a meta key from its value
pub const PAIR_SPLITTER: u8 = b'\r';

/// Fields shared by the fixed header of requests and responses
struct FixedHeader {
    head_length: u32,
    body_length: u32,
    message_id: u32,
    version: u8,
    compression: u8,
    serializer: u8,
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
///
/// The declared lengths must match the contents; see [`Request::set_lengths`].
pub fn encode_request(req: &Request) -> Result<Bytes> {
    validate_request(req)?;

    let head_length = req.computed_head_length();
    check_lengths(
        "request",
        req.head_length,
        head_length,
        req.body_length,
        req.data.len(),
    )?;

    let mut buf = BytesMut::with_capacity(head_length + req.data.len());
    put_fixed_header(
        &mut buf,
        &FixedHeader {
            head_length: req.head_length,
            body_length: req.body_length,
            message_id: req.message_id,
            version: req.version,
            compression: req.compression,
            serializer: req.serializer,
        },
    );

    buf.put_slice(req.service_name.as_bytes());
    buf.put_u8(SPLITTER);
    buf.put_slice(req.method_name.as_bytes());
    buf.put_u8(SPLITTER);

    for (key, value) in &req.meta {
        buf.put_slice(key.as_bytes());
        buf.put_u8(PAIR_SPLITTER);
        buf.put_slice(value.as_bytes());
        buf.put_u8(SPLITTER);
    }

    buf.put_slice(&req.data);
    Ok(buf.freeze())
}

/// Decode a request from one complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let header = read_fixed_header(bytes)?;
    let head_end = header.head_length as usize;

    let mut rest = &bytes[FIXED_HEADER_SIZE..head_end];

    let service_name = take_field(&mut rest, "service name")?;
    let method_name = take_field(&mut rest, "method name")?;

    let mut meta = BTreeMap::new();
    while !rest.is_empty() {
        let pair = take_until(&mut rest, SPLITTER).ok_or_else(|| {
            RpcError::Decode("meta pair is missing its terminator".to_string())
        })?;

        let split = pair
            .iter()
            .position(|&b| b == PAIR_SPLITTER)
            .ok_or_else(|| RpcError::Decode("meta pair is missing its key separator".to_string()))?;

        let key = utf8(&pair[..split], "meta key")?;
        let value = utf8(&pair[split + 1..], "meta value")?;

        if meta.insert(key, value).is_some() {
            return Err(RpcError::Decode("duplicate meta key".to_string()));
        }
    }

    Ok(Request {
        head_length: header.head_length,
        body_length: header.body_length,
        message_id: header.message_id,
        version: header.version,
        compression: header.compression,
        serializer: header.serializer,
        service_name,
        method_name,
        meta,
        data: Bytes::copy_from_slice(&bytes[head_end..]),
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(resp: &Response) -> Result<Bytes> {
    let head_length = resp.computed_head_length();
    check_lengths(
        "response",
        resp.head_length,
        head_length,
        resp.body_length,
        resp.data.len(),
    )?;

    let mut buf = BytesMut::with_capacity(head_length + resp.data.len());
    put_fixed_header(
        &mut buf,
        &FixedHeader {
            head_length: resp.head_length,
            body_length: resp.body_length,
            message_id: resp.message_id,
            version: resp.version,
            compression: resp.compression,
            serializer: resp.serializer,
        },
    );
    buf.put_slice(&resp.error);
    buf.put_slice(&resp.data);
    Ok(buf.freeze())
}

/// Decode a response from one complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let header = read_fixed_header(bytes)?;
    let head_end = header.head_length as usize;

    Ok(Response {
        head_length: header.head_length,
        body_length: header.body_length,
        message_id: header.message_id,
        version: header.version,
        compression: header.compression,
        serializer: header.serializer,
        error: Bytes::copy_from_slice(&bytes[FIXED_HEADER_SIZE..head_end]),
        data: Bytes::copy_from_slice(&bytes[head_end..]),
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Reject names and meta entries that would not survive a round trip
pub fn validate_request(req: &Request) -> Result<()> {
    check_text("service name", &req.service_name, true)?;
    check_text("method name", &req.method_name, true)?;
    for (key, value) in &req.meta {
        check_text("meta key", key, true)?;
        check_text("meta value", value, false)?;
    }
    Ok(())
}

fn check_text(what: &str, text: &str, forbid_pair_splitter: bool) -> Result<()> {
    let bad = text
        .bytes()
        .any(|b| b == SPLITTER || (forbid_pair_splitter && b == PAIR_SPLITTER));
    if bad {
        return Err(RpcError::Encode(format!(
            "{} {:?} contains a separator byte",
            what, text
        )));
    }
    Ok(())
}

fn check_lengths(
    what: &str,
    declared_head: u32,
    actual_head: usize,
    declared_body: u32,
    actual_body: usize,
) -> Result<()> {
    if declared_head as usize != actual_head || declared_body as usize != actual_body {
        return Err(RpcError::Encode(format!(
            "{} lengths are stale: declared head={} body={}, actual head={} body={}",
            what, declared_head, declared_body, actual_head, actual_body
        )));
    }
    if actual_head + actual_body > MAX_FRAME_SIZE {
        return Err(RpcError::Encode(format!(
            "{} too large: {} bytes (max {})",
            what,
            actual_head + actual_body,
            MAX_FRAME_SIZE
        )));
    }
    Ok(())
}

fn put_fixed_header(buf: &mut BytesMut, header: &FixedHeader) {
    buf.put_u32(header.head_length);
    buf.put_u32(header.body_length);
    buf.put_u32(header.message_id);
    buf.put_u8(header.version);
    buf.put_u8(header.compression);
    buf.put_u8(header.serializer);
}

/// Parse the fixed header and check the declared lengths against the buffer
fn read_fixed_header(bytes: &[u8]) -> Result<FixedHeader> {
    if bytes.len() < FIXED_HEADER_SIZE {
        return Err(RpcError::Decode(format!(
            "Incomplete header: expected {} bytes, got {}",
            FIXED_HEADER_SIZE,
            bytes.len()
        )));
    }

    let header = FixedHeader {
        head_length: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        body_length: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        message_id: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        version: bytes[12],
        compression: bytes[13],
        serializer: bytes[14],
    };

    if (header.head_length as usize) < FIXED_HEADER_SIZE {
        return Err(RpcError::Decode(format!(
            "Head length {} is shorter than the fixed header",
            header.head_length
        )));
    }

    let total = header.head_length as u64 + header.body_length as u64;
    if total != bytes.len() as u64 {
        return Err(RpcError::Decode(format!(
            "Frame length mismatch: header declares {} bytes, got {}",
            total,
            bytes.len()
        )));
    }

    Ok(header)
}

/// Split off everything up to the next `delim`, consuming the delimiter
fn take_until<'a>(rest: &mut &'a [u8], delim: u8) -> Option<&'a [u8]> {
    let index = rest.iter().position(|&b| b == delim)?;
    let field = &rest[..index];
    *rest = &rest[index + 1..];
    Some(field)
}

fn take_field(rest: &mut &[u8], what: &str) -> Result<String> {
    let field = take_until(rest, SPLITTER)
        .ok_or_else(|| RpcError::Decode(format!("{} is missing its terminator", what)))?;
    utf8(field, what)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RpcError::Decode(format!("{} is not valid UTF-8", what)))
}
