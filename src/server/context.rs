//! Handler-facing types
//!
//! What a handler sees about the call it serves, and what it hands back.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::SocketAddr;

use crate::protocol::Request;

/// Per-call information passed to every handler
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    message_id: u32,
    one_way: bool,
    service: String,
    method: String,
    meta: BTreeMap<String, String>,
    peer_addr: Option<SocketAddr>,
}

impl CallContext {
    pub(crate) fn from_request(req: &Request, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            message_id: req.message_id,
            one_way: req.is_one_way(),
            service: req.service_name.clone(),
            method: req.method_name.clone(),
            meta: req.meta.clone(),
            peer_addr,
        }
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    /// True when the caller will never see the result
    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// A metadata value sent by the caller
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

/// What a handler returns
///
/// `value` and `error` are independent; a handler may return a partial
/// value together with an error and the client receives both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn err(error: impl Display) -> Self {
        Self {
            value: None,
            error: Some(error.to_string()),
        }
    }

    /// A value and an error together
    pub fn partial(value: T, error: impl Display) -> Self {
        Self {
            value: Some(value),
            error: Some(error.to_string()),
        }
    }

    /// Neither a value nor an error
    pub fn empty() -> Self {
        Self {
            value: None,
            error: None,
        }
    }
}

impl<T, E: Display> From<std::result::Result<T, E>> for Outcome<T> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(e),
        }
    }
}
