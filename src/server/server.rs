//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use super::connection::Connection;
use super::dispatch::{Dispatcher, IntoService, ServiceRegistry};
use super::oneway::{OneWayOutcome, OneWaySupervisor};
use crate::config::ServerConfig;
use crate::error::{Result, RpcError};
use crate::serialize::{Codec, Serializer, SerializerRegistry};

/// How often the accept loop checks the shutdown flag while idle
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// RPC server
///
/// Services and serializers are registered first; [`Server::bind`] then
/// freezes both registries and starts serving.
pub struct Server<S = Codec> {
    config: ServerConfig,
    services: ServiceRegistry<S>,
    serializers: SerializerRegistry<S>,
    outcomes: Option<Sender<OneWayOutcome>>,
}

impl Server<Codec> {
    /// Create a server that accepts JSON payloads
    pub fn new(config: ServerConfig) -> Self {
        Self::with_default_serializer(config, Codec::JSON)
    }
}

impl<S: Serializer + Clone> Server<S> {
    /// Create a server whose registry starts with `serializer`
    pub fn with_default_serializer(config: ServerConfig, serializer: S) -> Self {
        Self {
            config,
            services: ServiceRegistry::new(),
            serializers: SerializerRegistry::with_serializer(serializer),
            outcomes: None,
        }
    }

    /// Accept one more payload encoding
    pub fn register_serializer(&mut self, serializer: S) -> Result<()> {
        self.serializers.register(serializer)
    }

    /// Register a service; names are validated here, not on first call
    pub fn register_service(&mut self, service: impl IntoService<S>) -> Result<()> {
        self.services.register(service.into_service())
    }

    /// Subscribe to the outcomes of one-way calls
    pub fn one_way_outcomes(&mut self) -> Receiver<OneWayOutcome> {
        let (tx, rx) = channel::unbounded();
        self.outcomes = Some(tx);
        rx
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the listener and start accepting on a background thread
    pub fn bind(self) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Listening on {} ({} services, serializer codes {:?})",
            local_addr,
            self.services.len(),
            self.serializers.codes()
        );

        let dispatcher = Arc::new(Dispatcher::new(
            self.services,
            self.serializers,
            OneWaySupervisor::new(self.outcomes),
        ));

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_loop = AcceptLoop {
            listener,
            dispatcher,
            config: self.config,
            shutdown: Arc::clone(&shutdown),
            connections: Vec::new(),
            next_id: 0,
        };

        let accept_thread = thread::Builder::new()
            .name("tinyrpc-accept".to_string())
            .spawn(move || accept_loop.run())?;

        Ok(ServerHandle {
            local_addr,
            shutdown,
            accept_thread: Some(accept_thread),
        })
    }

    /// Bind and serve on the calling thread until shut down
    pub fn serve(self) -> Result<()> {
        self.bind()?.join()
    }
}

// =============================================================================
// Server Handle
// =============================================================================

/// A running server
///
/// Dropping the handle shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag that stops the server when set, for signal handlers
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Stop accepting, close every connection and wait for all threads
    pub fn shutdown(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.wait()
    }

    /// Block until the server stops
    pub fn join(mut self) -> Result<()> {
        self.wait()
    }

    fn wait(&mut self) -> Result<()> {
        match self.accept_thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RpcError::Transport("accept loop panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.accept_thread.is_some() {
            self.shutdown.store(true, Ordering::Release);
            if let Err(e) = self.wait() {
                tracing::warn!("Server stopped with error: {}", e);
            }
        }
    }
}

// =============================================================================
// Accept Loop
// =============================================================================

/// A connection thread and a handle on its socket for shutdown
struct LiveConnection {
    id: u64,
    stream: TcpStream,
    thread: JoinHandle<()>,
}

struct AcceptLoop<S> {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher<S>>,
    config: ServerConfig,
    shutdown: Arc<AtomicBool>,
    connections: Vec<LiveConnection>,
    next_id: u64,
}

impl<S: Serializer + Clone> AcceptLoop<S> {
    fn run(mut self) -> Result<()> {
        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        self.stop();
        Ok(())
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        self.reap();

        if self.connections.len() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting {}: {} connections already open",
                peer,
                self.connections.len()
            );
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        if let Err(e) = self.spawn_connection(stream, peer) {
            tracing::warn!("Failed to start connection for {}: {}", peer, e);
        }
    }

    fn spawn_connection(&mut self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        // Accepted sockets inherit non-blocking mode on some platforms
        stream.set_nonblocking(false)?;

        let control = stream.try_clone()?;
        let mut conn = Connection::new(stream, Arc::clone(&self.dispatcher))?;
        conn.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        let id = self.next_id;
        self.next_id += 1;

        let thread = thread::Builder::new()
            .name(format!("tinyrpc-conn-{}", id))
            .spawn(move || {
                if let Err(e) = conn.handle() {
                    tracing::debug!("Connection {} from {} ended: {}", id, peer, e);
                }
                conn.close();
            })?;

        self.connections.push(LiveConnection {
            id,
            stream: control,
            thread,
        });
        Ok(())
    }

    /// Join connection threads that have already finished
    fn reap(&mut self) {
        let (done, live): (Vec<_>, Vec<_>) = self
            .connections
            .drain(..)
            .partition(|conn| conn.thread.is_finished());
        self.connections = live;

        for conn in done {
            if conn.thread.join().is_err() {
                tracing::warn!("Connection {} thread panicked", conn.id);
            }
        }
    }

    fn stop(&mut self) {
        tracing::info!(
            "Shutting down: closing {} connections",
            self.connections.len()
        );

        for conn in &self.connections {
            let _ = conn.stream.shutdown(Shutdown::Both);
        }
        for conn in self.connections.drain(..) {
            if conn.thread.join().is_err() {
                tracing::warn!("Connection {} thread panicked", conn.id);
            }
        }

        let pending = self.dispatcher.one_way().pending();
        if pending > 0 {
            tracing::debug!("Waiting for {} one-way tasks", pending);
        }
        self.dispatcher.one_way().join_all();

        tracing::info!("Server stopped");
    }
}
