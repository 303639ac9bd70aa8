//! # tinyrpc
//!
//! A minimal RPC framework with:
//! - A compact, length-prefixed binary wire protocol
//! - Typed client stubs and server dispatch tables from one declaration
//! - Pluggable payload serializers selected per message (JSON, bincode)
//! - Pooled client connections
//! - One-way (fire-and-forget) calls
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────┐            ┌─────────────────────────────┐
//! │        Client stub          │            │        Accept loop          │
//! │  (generated by rpc_service) │            │  (one thread per connection)│
//! └──────────────┬──────────────┘            └──────────────┬──────────────┘
//!                │                                          │
//! ┌──────────────▼──────────────┐            ┌──────────────▼──────────────┐
//! │   Client dispatch engine    │            │       Stream framer         │
//! │  serialize → build Request  │            │   read exactly one frame    │
//! └──────────────┬──────────────┘            └──────────────┬──────────────┘
//!                │                                          │
//! ┌──────────────▼──────────────┐   TCP      ┌──────────────▼──────────────┐
//! │    Connection proxy         │ ─────────► │        Dispatcher           │
//! │  wire codec + pool + framer │ ◄───────── │  service → method → handler │
//! └─────────────────────────────┘            └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod serialize;
pub mod service;
pub mod pool;
pub mod client;
pub mod server;
pub mod demo;

mod macros;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, RpcError};
pub use config::{ClientConfig, PoolConfig, ServerConfig};
pub use client::{CallOptions, Client, Reply};
pub use serialize::{BincodeSerializer, Codec, JsonSerializer, Serializer};
pub use server::{CallContext, Outcome, Server, ServerHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tinyrpc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
