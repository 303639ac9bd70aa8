//! Pool implementation
//!
//! VecDeque of idle connections behind a parking_lot Mutex, with a Condvar
//! to wake callers blocked on an exhausted pool.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::{Result, RpcError};

type Factory<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

/// An idle connection and the moment it was returned
struct IdleEntry<C> {
    conn: C,
    since: Instant,
}

struct PoolState<C> {
    /// Oldest at the front, most recently returned at the back
    idle: VecDeque<IdleEntry<C>>,

    /// Connections alive right now, checked out or idle
    open: usize,

    closed: bool,
}

/// Bounded pool of reusable connections
pub struct ConnectionPool<C> {
    state: Mutex<PoolState<C>>,
    available: Condvar,
    factory: Factory<C>,
    config: PoolConfig,
}

impl<C: Send> ConnectionPool<C> {
    /// Create a pool and dial `initial_size` connections up front
    pub fn new<F>(config: PoolConfig, factory: F) -> Result<Self>
    where
        F: Fn() -> Result<C> + Send + Sync + 'static,
    {
        if config.max_size == 0 {
            return Err(RpcError::Config("pool max_size must be at least 1".to_string()));
        }
        if config.initial_size > config.max_size {
            return Err(RpcError::Config(format!(
                "pool initial_size {} exceeds max_size {}",
                config.initial_size, config.max_size
            )));
        }

        let mut idle = VecDeque::with_capacity(config.initial_size);
        for _ in 0..config.initial_size {
            idle.push_back(IdleEntry {
                conn: factory()?,
                since: Instant::now(),
            });
        }

        Ok(Self {
            state: Mutex::new(PoolState {
                open: idle.len(),
                idle,
                closed: false,
            }),
            available: Condvar::new(),
            factory: Box::new(factory),
            config,
        })
    }

    /// Check out a connection
    ///
    /// Reuses the most recently returned idle connection, dials a new one if
    /// the pool is below `max_size`, and otherwise waits for a release.
    pub fn acquire(&self) -> Result<PooledConnection<'_, C>> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(RpcError::Transport("connection pool is closed".to_string()));
            }

            let expired = self.evict_expired(&mut state);

            if let Some(entry) = state.idle.pop_back() {
                drop(state);
                drop(expired);
                return Ok(PooledConnection::new(self, entry.conn));
            }

            if state.open < self.config.max_size {
                state.open += 1;
                drop(state);
                drop(expired);
                return match (self.factory)() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(e) => {
                        self.forget_one();
                        Err(e)
                    }
                };
            }

            drop(expired);
            if self.available.wait_until(&mut state, deadline).timed_out() {
                tracing::debug!(max = self.config.max_size, "connection pool exhausted");
                return Err(RpcError::PoolExhausted {
                    max: self.config.max_size,
                });
            }
        }
    }

    /// Close idle connections and refuse further acquisitions
    ///
    /// Connections still checked out are closed when they come back.
    pub fn close(&self) {
        let drained: Vec<IdleEntry<C>> = {
            let mut state = self.state.lock();
            state.closed = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.open -= drained.len();
            drained
        };
        self.available.notify_all();
        drop(drained);
    }

    /// Number of idle connections
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of live connections, checked out or idle
    pub fn open_count(&self) -> usize {
        self.state.lock().open
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Pull expired connections out of the idle list
    ///
    /// The caller drops them after releasing the lock.
    fn evict_expired(&self, state: &mut PoolState<C>) -> Vec<C> {
        let mut expired = Vec::new();
        while let Some(front) = state.idle.front() {
            if front.since.elapsed() < self.config.idle_timeout {
                break;
            }
            if let Some(entry) = state.idle.pop_front() {
                state.open -= 1;
                expired.push(entry.conn);
            }
        }
        if !expired.is_empty() {
            tracing::trace!(count = expired.len(), "evicted idle connections");
        }
        expired
    }

    /// Give a connection back, keeping it if policy allows
    fn release(&self, conn: C, reusable: bool) {
        let rejected = {
            let mut state = self.state.lock();
            if reusable && !state.closed && state.idle.len() < self.config.max_idle {
                state.idle.push_back(IdleEntry {
                    conn,
                    since: Instant::now(),
                });
                None
            } else {
                state.open -= 1;
                Some(conn)
            }
        };
        self.available.notify_one();
        drop(rejected);
    }

    /// Release a slot reserved for a dial that failed
    fn forget_one(&self) {
        self.state.lock().open -= 1;
        self.available.notify_one();
    }
}

/// A checked-out connection
///
/// Goes back to the pool when dropped, unless [`PooledConnection::discard`]
/// was called.
pub struct PooledConnection<'a, C: Send> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
    reusable: bool,
}

impl<'a, C: Send> PooledConnection<'a, C> {
    fn new(pool: &'a ConnectionPool<C>, conn: C) -> Self {
        Self {
            pool,
            conn: Some(conn),
            reusable: true,
        }
    }

    /// Close the connection on release instead of returning it to the pool
    pub fn discard(&mut self) {
        self.reusable = false;
    }
}

impl<C: Send> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // Only `drop` takes the connection out
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<C: Send> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<C: Send> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.reusable);
        }
    }
}
