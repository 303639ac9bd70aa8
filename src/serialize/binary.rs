//! Compact binary payloads via bincode

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Serializer;
use crate::error::{Result, RpcError};

/// Bincode serializer (code 2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BincodeSerializer;

impl BincodeSerializer {
    pub const CODE: u8 = 2;
}

impl Serializer for BincodeSerializer {
    fn code(&self) -> u8 {
        Self::CODE
    }

    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| RpcError::Encode(format!("bincode: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        bincode::deserialize(data).map_err(|e| RpcError::Decode(format!("bincode: {}", e)))
    }
}
