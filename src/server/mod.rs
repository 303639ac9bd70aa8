//! Server Module
//!
//! Accepts connections and routes requests to registered handlers.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection, requests handled in order
//! - One supervised thread per one-way request
//! - Requests routed through a dispatch table built at registration time

mod connection;
mod context;
mod dispatch;
mod oneway;
mod server;

pub use context::{CallContext, Outcome};
pub use dispatch::{IntoService, MethodHandler, RawOutcome, ServiceDefinition, ServiceRegistry};
pub use oneway::OneWayOutcome;
pub use server::{Server, ServerHandle};
