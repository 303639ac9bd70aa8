//! Protocol Module
//!
//! Defines the wire protocol shared by client and server.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────────────────────── head_length ─────────────────────────┬── body_length ──┐
//! │ fixed header (15) │ variable header                              │ payload         │
//! └───────────────────┴──────────────────────────────────────────────┴─────────────────┘
//! ```
//!
//! ### Fixed Header
//! - 0..4:   head length (u32, big-endian)
//! - 4..8:   body length (u32, big-endian)
//! - 8..12:  message id (u32, big-endian)
//! - 12:     protocol version
//! - 13:     compression algorithm (carried, unused)
//! - 14:     serializer code
//!
//! ### Variable Header
//! - Request:  `service \n method \n (key \r value \n)*`
//! - Response: raw error text

mod message;
mod codec;
mod framer;

pub use message::{Request, Response, ONE_WAY_KEY};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, validate_request,
    PAIR_SPLITTER, SPLITTER,
};
pub use framer::{read_frame, write_frame};

/// Size of the fixed header shared by requests and responses
pub const FIXED_HEADER_SIZE: usize = 15;

/// Bytes a framer needs before it knows the full frame length
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol version written by this crate
pub const PROTOCOL_VERSION: u8 = 1;

/// Compression algorithm code for "none"
pub const COMPRESSION_NONE: u8 = 0;
