//! Client Module
//!
//! Turns ordinary method calls into network round trips.
//!
//! ## Call Path
//! ```text
//! stub.get_by_id(&opts, &req)
//!   └─ Client::call          serialize, build Request, set lengths
//!        └─ Proxy::invoke    encode, pooled connection, write, read, decode
//!   ◄─ Reply { value, error }
//! ```
//!
//! Stubs are generated by [`rpc_service!`](crate::rpc_service); [`Client::call`]
//! is the engine underneath and can be used directly.

mod proxy;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Result, RpcError};
use crate::protocol::{Request, Response, COMPRESSION_NONE, ONE_WAY_KEY, PROTOCOL_VERSION};
use crate::serialize::{Codec, Serializer};
use crate::service::{validate_descriptor, ServiceDescriptor};

pub use proxy::{Connection, ConnectionProxy};

// =============================================================================
// Call Options
// =============================================================================

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Fire-and-forget: write the request and return without a response
    pub one_way: bool,

    /// Read/write deadline for this call, overriding the client defaults
    pub timeout: Option<Duration>,

    /// Extra metadata sent in the request header
    pub meta: BTreeMap<String, String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a one-way call
    pub fn one_way() -> Self {
        Self {
            one_way: true,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Reply
// =============================================================================

/// Result of a remote call
///
/// `value` is always present: it holds whatever the server returned, or
/// `T::default()` when nothing could be decoded. A handler may return a
/// partial value together with an error, so both fields can be set.
#[derive(Debug)]
pub struct Reply<T> {
    pub value: T,
    pub error: Option<RpcError>,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Drop the value when an error is present
    pub fn into_result(self) -> Result<T> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }

    pub fn into_parts(self) -> (T, Option<RpcError>) {
        (self.value, self.error)
    }
}

impl<T: Default> Reply<T> {
    /// A default value carrying `error`
    pub fn failed(error: RpcError) -> Self {
        Self {
            value: T::default(),
            error: Some(error),
        }
    }
}

// =============================================================================
// Proxy
// =============================================================================

/// Sends a request somewhere and brings back the response
pub trait Proxy: Send + Sync + 'static {
    /// Perform one exchange
    ///
    /// One-way calls return [`RpcError::OneWay`] once the request is written.
    fn invoke(&self, opts: &CallOptions, request: Request) -> Result<Response>;
}

impl<P: Proxy + ?Sized> Proxy for Arc<P> {
    fn invoke(&self, opts: &CallOptions, request: Request) -> Result<Response> {
        (**self).invoke(opts, request)
    }
}

/// A stub type that can be bound to a client
///
/// Implemented by the stubs [`rpc_service!`](crate::rpc_service) generates.
pub trait RemoteService<P, S>: ServiceDescriptor + Sized {
    fn bind(client: Client<P, S>) -> Self;
}

// =============================================================================
// Client
// =============================================================================

struct ClientInner<P, S> {
    proxy: P,
    serializer: S,
    next_id: AtomicU32,
}

/// Client dispatch engine
///
/// Cheap to clone; clones share the proxy and the message id counter.
pub struct Client<P = ConnectionProxy, S = Codec> {
    inner: Arc<ClientInner<P, S>>,
}

impl<P, S> Clone for Client<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client<ConnectionProxy, Codec> {
    /// Connect with the default JSON serializer
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with(config, Codec::JSON)
    }
}

impl<S: Serializer> Client<ConnectionProxy, S> {
    /// Connect with a chosen serializer
    pub fn connect_with(config: ClientConfig, serializer: S) -> Result<Self> {
        let proxy = ConnectionProxy::connect(config)?;
        Ok(Self::with_proxy(proxy, serializer))
    }
}

impl<P: Proxy, S: Serializer> Client<P, S> {
    /// Build a client over any proxy
    pub fn with_proxy(proxy: P, serializer: S) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                proxy,
                serializer,
                next_id: AtomicU32::new(1),
            }),
        }
    }

    pub fn proxy(&self) -> &P {
        &self.inner.proxy
    }

    pub fn serializer(&self) -> &S {
        &self.inner.serializer
    }

    /// Bind a generated stub to this client
    ///
    /// Validates the stub's descriptor first; a bad descriptor fails with
    /// [`RpcError::Config`] and nothing is bound.
    pub fn init_service<T: RemoteService<P, S>>(&self) -> Result<T> {
        validate_descriptor(T::NAME, T::METHODS.iter().copied())?;
        Ok(T::bind(self.clone()))
    }

    /// Call `service.method` with `req` and decode the reply
    pub fn call<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        opts: &CallOptions,
        req: &Req,
    ) -> Reply<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Default,
    {
        let serializer = &self.inner.serializer;

        let data = match serializer.encode(req) {
            Ok(data) => data,
            Err(e) => return Reply::failed(e),
        };

        let request = self.build_request(service, method, opts, data);
        tracing::trace!(
            service,
            method,
            message_id = request.message_id,
            one_way = opts.one_way,
            "invoking"
        );

        let response = match self.inner.proxy.invoke(opts, request) {
            Ok(response) => response,
            Err(e) => return Reply::failed(e),
        };

        let remote_error = if response.has_error() {
            Some(RpcError::from_remote(&response.error))
        } else {
            None
        };

        if response.data.is_empty() {
            return Reply {
                value: Resp::default(),
                error: remote_error,
            };
        }

        match serializer.decode::<Resp>(&response.data) {
            Ok(value) => Reply {
                value,
                error: remote_error,
            },
            Err(e) => Reply::failed(e),
        }
    }

    fn build_request(
        &self,
        service: &str,
        method: &str,
        opts: &CallOptions,
        data: Vec<u8>,
    ) -> Request {
        let mut meta = opts.meta.clone();
        if opts.one_way {
            meta.insert(ONE_WAY_KEY.to_string(), "true".to_string());
        } else {
            meta.remove(ONE_WAY_KEY);
        }

        let mut request = Request {
            message_id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            version: PROTOCOL_VERSION,
            compression: COMPRESSION_NONE,
            serializer: self.inner.serializer.code(),
            service_name: service.to_string(),
            method_name: method.to_string(),
            meta,
            data: data.into(),
            ..Request::default()
        };
        request.set_lengths();
        request
    }
}
