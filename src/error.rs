//! Error types for tinyrpc
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RpcError
pub type Result<T> = std::result::Result<T, RpcError>;

/// Prefix carried by in-band routing errors so the client can tell them
/// apart from handler errors.
pub const ROUTING_PREFIX: &str = "routing error: ";

/// Error text the server sends back for a one-way request.
pub const ONE_WAY_ACK: &str = "one-way request accepted, no response will be produced";

/// Unified error type for tinyrpc operations
#[derive(Debug, Error)]
pub enum RpcError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection pool exhausted: {max} connections in use")]
    PoolExhausted { max: usize },

    // -------------------------------------------------------------------------
    // Wire / Payload Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Remote Errors (carried in-band in Response.error)
    // -------------------------------------------------------------------------
    #[error("routing error: {0}")]
    Routing(String),

    /// Business error text returned by a handler
    #[error("{0}")]
    Handler(String),

    /// Returned for every one-way call; the outcome is never observed
    #[error("one-way call: no response expected")]
    OneWay,
}

impl RpcError {
    /// Rebuild an error from the bytes of `Response.error`
    pub fn from_remote(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match text.strip_prefix(ROUTING_PREFIX) {
            Some(rest) => RpcError::Routing(rest.to_string()),
            None => RpcError::Handler(text.into_owned()),
        }
    }

    /// True when the connection that produced this error can no longer be
    /// trusted to sit on a frame boundary.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::Io(_) | RpcError::Transport(_) | RpcError::Decode(_)
        )
    }

    /// True for the one-way sentinel
    pub fn is_one_way(&self) -> bool {
        matches!(self, RpcError::OneWay)
    }
}
