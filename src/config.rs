//! Configuration for tinyrpc
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for a tinyrpc server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP listen address (port 0 picks a free port)
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = wait forever)
    ///
    /// Pooled client connections sit idle between calls, so a non-zero value
    /// closes them on the server side once they have been quiet that long.
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = wait forever)
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8081".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

// =============================================================================
// Pool Configuration
// =============================================================================

/// Connection pool sizing and eviction policy
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connections dialed eagerly when the pool is created
    pub initial_size: usize,

    /// Hard cap on connections checked out plus idle
    pub max_size: usize,

    /// Idle connections kept around; extras are closed on release
    pub max_idle: usize,

    /// Idle connections older than this are closed instead of reused
    pub idle_timeout: Duration,

    /// How long `acquire` blocks when every connection is checked out
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 1,
            max_size: 30,
            max_idle: 10,
            idle_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for a tinyrpc client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote server address (host:port)
    pub server_addr: String,

    /// Dial timeout (milliseconds)
    pub dial_timeout_ms: u64,

    /// Default read timeout when a call carries no timeout of its own
    /// (milliseconds, 0 = wait forever)
    pub read_timeout_ms: u64,

    /// Default write timeout when a call carries no timeout of its own
    /// (milliseconds, 0 = wait forever)
    pub write_timeout_ms: u64,

    /// Connection pool policy
    pub pool: PoolConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8081".to_string(),
            dial_timeout_ms: 3000,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            pool: PoolConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server address
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the dial timeout (in milliseconds)
    pub fn dial_timeout_ms(mut self, ms: u64) -> Self {
        self.config.dial_timeout_ms = ms;
        self
    }

    /// Set the default read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the default write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the number of connections dialed up front
    pub fn pool_initial_size(mut self, size: usize) -> Self {
        self.config.pool.initial_size = size;
        self
    }

    /// Set the maximum number of pooled connections
    pub fn pool_max_size(mut self, size: usize) -> Self {
        self.config.pool.max_size = size;
        self
    }

    /// Set the maximum number of idle connections kept
    pub fn pool_max_idle(mut self, count: usize) -> Self {
        self.config.pool.max_idle = count;
        self
    }

    /// Set the idle eviction timeout
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.idle_timeout = timeout;
        self
    }

    /// Set how long acquisition waits on an exhausted pool
    pub fn pool_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.acquire_timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
