//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use super::dispatch::Dispatcher;
use crate::error::{Result, RpcError};
use crate::protocol::{decode_request, encode_response, read_frame, write_frame, Response};
use crate::serialize::Serializer;

/// Handles a single client connection
pub(crate) struct Connection<S> {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared routing table
    dispatcher: Arc<Dispatcher<S>>,

    /// Peer address for logging and call contexts
    peer_addr: Option<SocketAddr>,
}

impl<S: Serializer + Clone> Connection<S> {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub(crate) fn new(stream: TcpStream, dispatcher: Arc<Dispatcher<S>>) -> Result<Self> {
        let peer_addr = stream.peer_addr().ok();

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            dispatcher,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub(crate) fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub(crate) fn handle(&mut self) -> Result<()> {
        let peer = self.peer();
        tracing::debug!("Connection established from {}", peer);

        loop {
            let frame = match read_frame(&mut self.reader) {
                Ok(frame) => frame,
                Err(RpcError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", peer);
                    return Ok(());
                }
                Err(RpcError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Read timeout (Windows uses TimedOut instead of WouldBlock)
                    tracing::debug!("Read timeout for client {}", peer);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", peer, e);
                    return Err(e);
                }
            };

            let request = match decode_request(&frame) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Malformed request from {}: {}", peer, e);
                    return Err(e);
                }
            };

            tracing::trace!(
                "Received {}.{} (message {}) from {}",
                request.service_name,
                request.method_name,
                request.message_id,
                peer
            );

            let response = self.dispatcher.dispatch(request, self.peer_addr);

            if let Err(e) = self.send_response(&response) {
                // A client that went away before its response was written is
                // a normal disconnect, not a server error.
                if let RpcError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == std::io::ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            peer,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", peer, e);
                return Err(e);
            }
        }
    }

    /// Shut the socket down in both directions
    ///
    /// The accept loop holds another handle on the same socket, so dropping
    /// this connection alone would leave the peer waiting.
    pub(crate) fn close(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::trace!("Flush on close failed for {}: {}", self.peer(), e);
        }
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        let bytes = encode_response(response)?;
        write_frame(&mut self.writer, &bytes)
    }

    fn peer(&self) -> String {
        self.peer_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
    )
}
