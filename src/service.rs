//! Service descriptors
//!
//! Names a service and its methods. Both sides validate a descriptor
//! before anything is bound or registered, so a bad name fails at start-up
//! instead of on the first call.

use std::collections::HashSet;

use crate::error::{Result, RpcError};
use crate::protocol::{PAIR_SPLITTER, SPLITTER};

/// Static description of a remote service
///
/// Implemented by the client stubs generated with [`rpc_service!`](crate::rpc_service).
pub trait ServiceDescriptor {
    /// Name carried in `Request.service_name`
    const NAME: &'static str;

    /// Method names carried in `Request.method_name`
    const METHODS: &'static [&'static str];
}

/// Check a service name and its method names
///
/// Names must be non-empty, free of the header separator bytes and unique
/// within the service.
pub fn validate_descriptor<'a, I>(name: &str, methods: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    validate_name("service", name)?;

    let mut seen = HashSet::new();
    for method in methods {
        validate_name("method", method)?;
        if !seen.insert(method) {
            return Err(RpcError::Config(format!(
                "service {:?} declares method {:?} twice",
                name, method
            )));
        }
    }

    if seen.is_empty() {
        return Err(RpcError::Config(format!(
            "service {:?} declares no methods",
            name
        )));
    }
    Ok(())
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RpcError::Config(format!("{} name must not be empty", kind)));
    }
    if name.bytes().any(|b| b == SPLITTER || b == PAIR_SPLITTER) {
        return Err(RpcError::Config(format!(
            "{} name {:?} contains a separator byte",
            kind, name
        )));
    }
    Ok(())
}
