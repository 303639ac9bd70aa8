//! Message definitions
//!
//! Requests and responses as they travel on the wire.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::{FIXED_HEADER_SIZE, PROTOCOL_VERSION};

/// Meta key that marks a request as fire-and-forget
pub const ONE_WAY_KEY: &str = "one-way";

/// An RPC request
///
/// `head_length` and `body_length` are derived fields: call
/// [`Request::set_lengths`] after changing anything else.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub head_length: u32,
    pub body_length: u32,
    pub message_id: u32,
    pub version: u8,
    /// Compression algorithm (carried, never applied)
    pub compression: u8,
    /// Serializer code of `data`
    pub serializer: u8,
    pub service_name: String,
    pub method_name: String,
    /// Extension metadata. Kept sorted so encoding is reproducible.
    pub meta: BTreeMap<String, String>,
    /// Serializer-encoded argument
    pub data: Bytes,
}

impl Request {
    /// Create a request for `service.method` with lengths already set
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        serializer: u8,
        data: impl Into<Bytes>,
    ) -> Self {
        let mut req = Self {
            version: PROTOCOL_VERSION,
            serializer,
            service_name: service_name.into(),
            method_name: method_name.into(),
            data: data.into(),
            ..Self::default()
        };
        req.set_lengths();
        req
    }

    /// Head length implied by the current contents
    pub fn computed_head_length(&self) -> usize {
        let meta: usize = self
            .meta
            .iter()
            .map(|(key, value)| key.len() + 1 + value.len() + 1)
            .sum();
        FIXED_HEADER_SIZE + self.service_name.len() + 1 + self.method_name.len() + 1 + meta
    }

    /// Recompute `head_length` and `body_length`
    pub fn set_lengths(&mut self) {
        self.head_length = self.computed_head_length() as u32;
        self.body_length = self.data.len() as u32;
    }

    /// Whether the caller asked for fire-and-forget semantics
    pub fn is_one_way(&self) -> bool {
        self.meta.get(ONE_WAY_KEY).map(String::as_str) == Some("true")
    }
}

/// An RPC response
///
/// `error` and `data` are independent: a handler may return a partial
/// result together with an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub head_length: u32,
    pub body_length: u32,
    pub message_id: u32,
    pub version: u8,
    pub compression: u8,
    pub serializer: u8,
    /// Error text, empty when the call succeeded
    pub error: Bytes,
    pub data: Bytes,
}

impl Response {
    /// Create an empty response mirroring the request's fixed header
    pub fn for_request(req: &Request) -> Self {
        let mut resp = Self {
            message_id: req.message_id,
            version: req.version,
            compression: req.compression,
            serializer: req.serializer,
            ..Self::default()
        };
        resp.set_lengths();
        resp
    }

    /// Head length implied by the current contents
    pub fn computed_head_length(&self) -> usize {
        FIXED_HEADER_SIZE + self.error.len()
    }

    /// Recompute `head_length` and `body_length`
    pub fn set_lengths(&mut self) {
        self.head_length = self.computed_head_length() as u32;
        self.body_length = self.data.len() as u32;
    }

    /// Replace the error text
    pub fn set_error(&mut self, message: &str) {
        self.error = Bytes::copy_from_slice(message.as_bytes());
        self.set_lengths();
    }

    /// Replace the payload
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
        self.set_lengths();
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}
