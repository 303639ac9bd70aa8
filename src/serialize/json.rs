//! JSON payloads via serde_json

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Serializer;
use crate::error::{Result, RpcError};

/// JSON serializer, the default (code 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub const CODE: u8 = 1;
}

impl Serializer for JsonSerializer {
    fn code(&self) -> u8 {
        Self::CODE
    }

    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| RpcError::Encode(format!("json: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| RpcError::Decode(format!("json: {}", e)))
    }
}
