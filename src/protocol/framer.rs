//! Stream framing
//!
//! Pulls exactly one message off a byte stream using only the 8-byte
//! length prefix (head length + body length).

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{FIXED_HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};
use crate::error::{Result, RpcError};

/// Read one complete frame from a stream
///
/// Blocks until the whole frame has arrived. Partial reads are retried
/// until the declared length is reached; a stream that ends early surfaces
/// as `io::ErrorKind::UnexpectedEof`. The returned buffer includes the
/// length prefix so it can be handed straight to the codec.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Bytes> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let head_length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let body_length = u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]) as usize;

    if head_length < FIXED_HEADER_SIZE {
        return Err(RpcError::Decode(format!(
            "Head length {} is shorter than the fixed header",
            head_length
        )));
    }

    let total = head_length + body_length;
    if total > MAX_FRAME_SIZE {
        return Err(RpcError::Decode(format!(
            "Frame too large: {} bytes (max {})",
            total, MAX_FRAME_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(total);
    frame.put_slice(&prefix);
    frame.resize(total, 0);
    reader.read_exact(&mut frame[LENGTH_PREFIX_SIZE..])?;

    Ok(frame.freeze())
}

/// Write one encoded frame to a stream and flush it
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}
