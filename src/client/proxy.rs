//! Connection-backed proxy
//!
//! Moves encoded requests over pooled TCP connections.

use std::io::BufReader;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{CallOptions, Proxy};
use crate::config::ClientConfig;
use crate::error::{Result, RpcError};
use crate::pool::ConnectionPool;
use crate::protocol::{decode_response, encode_request, read_frame, write_frame, Request, Response};

/// A client-side TCP connection
///
/// Tracks one-way acknowledgements the server has sent but nobody has read
/// yet; they are drained before the connection carries its next request.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (whole frames are written at once)
    writer: TcpStream,

    /// One-way acknowledgements still in flight on this stream
    pending_acks: usize,

    peer_addr: SocketAddr,
}

impl Connection {
    /// Dial `addr`, giving up after `timeout`
    pub fn dial(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| RpcError::Transport(format!("dial {}: {}", addr, e)))?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: stream,
            pending_acks: 0,
            peer_addr: addr,
        })
    }

    /// Apply read/write timeouts; `None` waits forever
    pub fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.set_write_timeout(write)?;
        Ok(())
    }

    /// Read and drop acknowledgements left behind by one-way calls
    fn drain_acks(&mut self) -> Result<()> {
        while self.pending_acks > 0 {
            let frame = read_frame(&mut self.reader)?;
            let ack = decode_response(&frame)?;
            tracing::trace!(
                "Drained one-way ack for message {} from {}",
                ack.message_id,
                self.peer_addr
            );
            self.pending_acks -= 1;
        }
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        write_frame(&mut self.writer, frame)
    }

    fn receive(&mut self) -> Result<Response> {
        let frame = read_frame(&mut self.reader)?;
        decode_response(&frame)
    }

    pub fn pending_acks(&self) -> usize {
        self.pending_acks
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

/// [`Proxy`] over a pool of TCP connections to one server
pub struct ConnectionProxy {
    pool: ConnectionPool<Connection>,
    config: ClientConfig,
}

impl ConnectionProxy {
    /// Resolve the server address and fill the pool
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let addr = config
            .server_addr
            .to_socket_addrs()
            .map_err(|e| RpcError::Config(format!("bad server address {:?}: {}", config.server_addr, e)))?
            .next()
            .ok_or_else(|| {
                RpcError::Config(format!("server address {:?} resolved to nothing", config.server_addr))
            })?;

        let dial_timeout = Duration::from_millis(config.dial_timeout_ms.max(1));
        let pool = ConnectionPool::new(config.pool.clone(), move || {
            Connection::dial(addr, dial_timeout)
        })?;

        Ok(Self { pool, config })
    }

    pub fn pool(&self) -> &ConnectionPool<Connection> {
        &self.pool
    }

    /// Close idle connections and refuse new calls
    pub fn close(&self) {
        self.pool.close();
    }

    /// Timeouts for one call: the call's own deadline, else the defaults
    fn timeouts(&self, opts: &CallOptions) -> (Option<Duration>, Option<Duration>) {
        match opts.timeout.filter(|t| !t.is_zero()) {
            Some(t) => (Some(t), Some(t)),
            None => (
                millis(self.config.read_timeout_ms),
                millis(self.config.write_timeout_ms),
            ),
        }
    }

    fn exchange(
        &self,
        conn: &mut Connection,
        opts: &CallOptions,
        request: &Request,
        frame: &[u8],
    ) -> Result<Response> {
        let (read_timeout, write_timeout) = self.timeouts(opts);
        conn.set_timeouts(read_timeout, write_timeout)?;

        conn.drain_acks()?;
        conn.send(frame)?;

        if opts.one_way {
            conn.pending_acks += 1;
            return Err(RpcError::OneWay);
        }

        let response = conn.receive()?;
        if response.message_id != request.message_id {
            return Err(RpcError::Decode(format!(
                "response for message {} arrived while waiting for {}",
                response.message_id, request.message_id
            )));
        }
        Ok(response)
    }
}

impl Proxy for ConnectionProxy {
    fn invoke(&self, opts: &CallOptions, request: Request) -> Result<Response> {
        let frame = encode_request(&request)?;
        let mut conn = self.pool.acquire()?;

        let result = self.exchange(&mut conn, opts, &request, &frame);
        if let Err(e) = &result {
            if e.is_transport() {
                tracing::debug!(
                    "Dropping connection to {} after transport failure: {}",
                    conn.peer_addr(),
                    e
                );
                conn.discard();
            }
        }
        result
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}
