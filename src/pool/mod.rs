//! Connection Pool Module
//!
//! A bounded, reusable set of connections to one remote address.
//!
//! ## Policy
//! - `initial_size` connections are dialed when the pool is created
//! - at most `max_size` connections exist at once (checked out + idle)
//! - at most `max_idle` connections are kept on release, extras are closed
//! - idle connections older than `idle_timeout` are closed instead of reused
//! - `acquire` blocks up to `acquire_timeout` when the pool is exhausted
//!
//! The pool only manages ownership. Whatever a connection is (a TCP stream,
//! a test double) is produced by the factory closure.

mod manager;

pub use manager::{ConnectionPool, PooledConnection};
