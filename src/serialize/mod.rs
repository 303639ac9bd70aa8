//! Serializer Module
//!
//! Payload codecs keyed by a one-byte code.
//!
//! ## Codes
//! - 1: JSON (default, always accepted by a server)
//! - 2: bincode
//!
//! The code travels in every message header, so a server can accept several
//! encodings at once and pick one per request. Serializers are generic over
//! the payload type; [`Codec`] closes over the built-in ones so a server can
//! keep them side by side in a [`SerializerRegistry`].

mod binary;
mod json;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, RpcError};

pub use binary::BincodeSerializer;
pub use json::JsonSerializer;

/// A payload encoding identified by a one-byte code
pub trait Serializer: Send + Sync + 'static {
    /// Code written into the `serializer` header field
    fn code(&self) -> u8;

    /// Human-readable name, used in logs
    fn name(&self) -> &'static str;

    /// Encode a value into payload bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode payload bytes into a fresh value
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

// =============================================================================
// Built-in Codec
// =============================================================================

/// Any of the built-in serializers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Json(JsonSerializer),
    Bincode(BincodeSerializer),
}

impl Codec {
    pub const JSON: Codec = Codec::Json(JsonSerializer);
    pub const BINCODE: Codec = Codec::Bincode(BincodeSerializer);

    /// Look up a built-in codec by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            JsonSerializer::CODE => Some(Self::JSON),
            BincodeSerializer::CODE => Some(Self::BINCODE),
            _ => None,
        }
    }

    /// Look up a built-in codec by name ("json" or "bincode")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Self::JSON),
            "bincode" => Some(Self::BINCODE),
            _ => None,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::JSON
    }
}

impl From<JsonSerializer> for Codec {
    fn from(s: JsonSerializer) -> Self {
        Codec::Json(s)
    }
}

impl From<BincodeSerializer> for Codec {
    fn from(s: BincodeSerializer) -> Self {
        Codec::Bincode(s)
    }
}

impl Serializer for Codec {
    fn code(&self) -> u8 {
        match self {
            Codec::Json(s) => s.code(),
            Codec::Bincode(s) => s.code(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Codec::Json(s) => s.name(),
            Codec::Bincode(s) => s.name(),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Codec::Json(s) => s.encode(value),
            Codec::Bincode(s) => s.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Codec::Json(s) => s.decode(data),
            Codec::Bincode(s) => s.decode(data),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// The set of serializers a server accepts, keyed by code
///
/// Filled before serving starts and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SerializerRegistry<S> {
    serializers: HashMap<u8, S>,
}

impl<S: Serializer> SerializerRegistry<S> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            serializers: HashMap::new(),
        }
    }

    /// Create a registry holding one serializer
    pub fn with_serializer(serializer: S) -> Self {
        let mut serializers = HashMap::new();
        serializers.insert(serializer.code(), serializer);
        Self { serializers }
    }

    /// Add a serializer; a second serializer with the same code is rejected
    pub fn register(&mut self, serializer: S) -> Result<()> {
        let code = serializer.code();
        if let Some(existing) = self.serializers.get(&code) {
            return Err(RpcError::Config(format!(
                "serializer code {} already registered by {}",
                code,
                existing.name()
            )));
        }
        self.serializers.insert(code, serializer);
        Ok(())
    }

    /// Find the serializer for a wire code
    pub fn get(&self, code: u8) -> Option<&S> {
        self.serializers.get(&code)
    }

    pub fn contains(&self, code: u8) -> bool {
        self.serializers.contains_key(&code)
    }

    /// Registered codes in ascending order
    pub fn codes(&self) -> Vec<u8> {
        let mut codes: Vec<u8> = self.serializers.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}

impl<S: Serializer> Default for SerializerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
