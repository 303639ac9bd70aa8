//! Dispatch table
//!
//! Maps service and method names to typed handlers. Built once while the
//! server is configured, then shared read-only by every connection.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::oneway::OneWaySupervisor;
use super::{CallContext, Outcome};
use crate::error::{Result, RpcError, ONE_WAY_ACK};
use crate::protocol::{Request, Response};
use crate::serialize::{Serializer, SerializerRegistry};
use crate::service::validate_descriptor;

// =============================================================================
// Method Handlers
// =============================================================================

/// Handler output before it is written into a Response
#[derive(Debug, Default)]
pub struct RawOutcome {
    pub data: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl RawOutcome {
    fn error(error: impl ToString) -> Self {
        Self {
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// A method that works on encoded payloads
pub trait MethodHandler<S>: Send + Sync + 'static {
    /// Decode the argument with `serializer`, run, encode the result
    fn call(&self, serializer: &S, ctx: &CallContext, payload: &[u8]) -> RawOutcome;
}

/// Wrapper that decodes the argument before calling a typed handler
struct TypedMethod<F, Req, Resp> {
    handler: F,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<S, F, Req, Resp> MethodHandler<S> for TypedMethod<F, Req, Resp>
where
    S: Serializer,
    F: Fn(&CallContext, Req) -> Outcome<Resp> + Send + Sync + 'static,
    Req: DeserializeOwned + 'static,
    Resp: Serialize + 'static,
{
    fn call(&self, serializer: &S, ctx: &CallContext, payload: &[u8]) -> RawOutcome {
        let req: Req = match serializer.decode(payload) {
            Ok(req) => req,
            Err(e) => return RawOutcome::error(e),
        };

        let outcome = (self.handler)(ctx, req);

        let data = match outcome.value {
            Some(value) => match serializer.encode(&value) {
                Ok(data) => Some(data),
                Err(e) => return RawOutcome::error(e),
            },
            None => None,
        };

        RawOutcome {
            data,
            error: outcome.error,
        }
    }
}

// =============================================================================
// Service Definitions
// =============================================================================

/// A named set of methods ready to be registered on a server
pub struct ServiceDefinition<S> {
    name: String,
    methods: Vec<(String, Arc<dyn MethodHandler<S>>)>,
}

impl<S: Serializer> ServiceDefinition<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a typed method
    pub fn method<Req, Resp, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CallContext, Req) -> Outcome<Resp> + Send + Sync + 'static,
        Req: DeserializeOwned + 'static,
        Resp: Serialize + 'static,
    {
        let typed: Arc<dyn MethodHandler<S>> = Arc::new(TypedMethod {
            handler,
            _phantom: PhantomData,
        });
        self.methods.push((name.into(), typed));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }
}

/// Anything that can become a [`ServiceDefinition`]
///
/// Implemented by the server adapters [`rpc_service!`](crate::rpc_service)
/// generates.
pub trait IntoService<S> {
    fn into_service(self) -> ServiceDefinition<S>;
}

impl<S> IntoService<S> for ServiceDefinition<S> {
    fn into_service(self) -> ServiceDefinition<S> {
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

type MethodTable<S> = HashMap<String, Arc<dyn MethodHandler<S>>>;

/// Registered services, keyed by name
pub struct ServiceRegistry<S> {
    services: HashMap<String, MethodTable<S>>,
}

impl<S: Serializer> ServiceRegistry<S> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Validate and add a service
    pub fn register(&mut self, definition: ServiceDefinition<S>) -> Result<()> {
        validate_descriptor(&definition.name, definition.method_names())?;

        if self.services.contains_key(&definition.name) {
            return Err(RpcError::Config(format!(
                "service {:?} is already registered",
                definition.name
            )));
        }

        let table: MethodTable<S> = definition.methods.into_iter().collect();
        tracing::debug!(
            "Registered service {} with {} methods",
            definition.name,
            table.len()
        );
        self.services.insert(definition.name, table);
        Ok(())
    }

    /// Resolve `service.method` to its handler
    pub fn lookup(&self, service: &str, method: &str) -> Result<&Arc<dyn MethodHandler<S>>> {
        let table = self
            .services
            .get(service)
            .ok_or_else(|| RpcError::Routing(format!("service not found: {}", service)))?;

        table.get(method).ok_or_else(|| {
            RpcError::Routing(format!("method not found: {}.{}", service, method))
        })
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl<S: Serializer> Default for ServiceRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes decoded requests to handlers and builds the responses
pub(crate) struct Dispatcher<S> {
    services: ServiceRegistry<S>,
    serializers: SerializerRegistry<S>,
    one_way: OneWaySupervisor,
}

impl<S: Serializer + Clone> Dispatcher<S> {
    pub(crate) fn new(
        services: ServiceRegistry<S>,
        serializers: SerializerRegistry<S>,
        one_way: OneWaySupervisor,
    ) -> Self {
        Self {
            services,
            serializers,
            one_way,
        }
    }

    /// Handle one request
    ///
    /// Routing and handler failures come back in-band in `Response.error`.
    pub(crate) fn dispatch(&self, request: Request, peer_addr: Option<SocketAddr>) -> Response {
        let mut response = Response::for_request(&request);

        let (handler, serializer) = match self.route(&request) {
            Ok(route) => route,
            Err(e) => {
                tracing::debug!(
                    "Rejected {}.{}: {}",
                    request.service_name,
                    request.method_name,
                    e
                );
                response.set_error(&e.to_string());
                return response;
            }
        };

        let ctx = CallContext::from_request(&request, peer_addr);

        if ctx.is_one_way() {
            self.one_way
                .spawn(Arc::clone(handler), serializer.clone(), ctx, request.data);
            response.set_error(ONE_WAY_ACK);
            return response;
        }

        let outcome = handler.call(serializer, &ctx, &request.data);
        if let Some(data) = outcome.data {
            response.set_data(data);
        }
        if let Some(error) = outcome.error {
            response.set_error(&error);
        }
        response
    }

    fn route(&self, request: &Request) -> Result<(&Arc<dyn MethodHandler<S>>, &S)> {
        let handler = self
            .services
            .lookup(&request.service_name, &request.method_name)?;

        let serializer = self.serializers.get(request.serializer).ok_or_else(|| {
            RpcError::Routing(format!(
                "unsupported serializer code: {}",
                request.serializer
            ))
        })?;

        Ok((handler, serializer))
    }

    pub(crate) fn one_way(&self) -> &OneWaySupervisor {
        &self.one_way
    }
}
