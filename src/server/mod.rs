//! Single-connection TCP server.
//!
//! The server binds in its constructor and then serves clients strictly one
//! at a time: accept, read one bounded chunk, call the handler, write the
//! response, close. No connection is kept alive and nothing is spawned.
//!
//! ```text
//! Created ──new()──▶ Bound ──listen()──▶ Listening ──shutdown──▶ Closed
//!    │
//!    └── port/bind failure: constructor returns an error
//! ```

use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::http::response::BoxError;
use crate::http::{IntoReply, Request, Response, StatusCode};

pub mod config;
pub mod shutdown;

pub use config::ServerConfig;
pub use shutdown::ShutdownHandle;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid port number: {port}. Valid port numbers are between 1 and 65535")]
    Port { port: i64 },

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot start listening: {reason}")]
    Invocation { reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("request handler failed: {0}")]
    Handler(#[source] BoxError),
}

// Lifecycle of the owned socket.
#[derive(Debug)]
enum Socket {
    Bound(TcpSocket),
    Listening(TcpListener),
    Closed,
}

/// A minimal HTTP server that owns one listening socket.
///
/// # Examples
///
/// ```rust,no_run
/// use barehttp::http::{Request, Response, StatusCode};
/// use barehttp::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut server = Server::new("127.0.0.1", 8000)?;
///     server
///         .listen(|req: Request| async move {
///             Response::new(format!("you asked for {}", req.uri()), StatusCode::Ok)
///         })
///         .await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Server {
    host: String,
    port: u16,
    config: ServerConfig,
    local_addr: SocketAddr,
    socket: Socket,
    running: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Validates the port and binds `host:port` with default options.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Port`] if `port` is outside `1..=65535`.
    /// - [`ServerError::Bind`] if the address cannot be resolved or bound.
    pub fn new(host: impl Into<String>, port: impl Into<i64>) -> Result<Self, ServerError> {
        Self::with_config(host, port, ServerConfig::default())
    }

    /// Like [`Server::new`], with explicit socket options.
    pub fn with_config(
        host: impl Into<String>,
        port: impl Into<i64>,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let host = host.into();
        let port = validate_port(port.into())?;
        let addr = format!("{host}:{port}");

        let bind_error = |source: io::Error| ServerError::Bind {
            addr: addr.clone(),
            source,
        };

        let target = resolve(&addr).map_err(bind_error)?;
        let socket = if target.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;

        if config.reuse_address {
            if let Err(e) = socket.set_reuseaddr(true) {
                warn!(error = %e, "unable to set SO_REUSEADDR on socket");
            }
        }

        socket.bind(target).map_err(bind_error)?;
        let local_addr = socket.local_addr()?;
        info!(address = %local_addr, "socket bound");

        let (running, _) = watch::channel(true);

        Ok(Self {
            host,
            port,
            config,
            local_addr,
            socket: Socket::Bound(socket),
            running: Arc::new(running),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the address the socket is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns `true` from a successful bind until shutdown.
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Returns a handle that can stop [`listen`](Self::listen) from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.running))
    }

    /// Serves clients one at a time until shutdown.
    ///
    /// For each connection the handler receives the parsed [`Request`]. If
    /// its reply carries no [`Response`], the client gets a `404`. Transport
    /// errors on a single connection are logged and the loop moves on.
    /// Handler panics are not caught.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Invocation`] if the server has already been shut down.
    /// - [`ServerError::Io`] if the bound socket cannot start listening.
    /// - [`ServerError::Handler`] if the handler returns an error; the loop
    ///   stops and the current client gets no response.
    pub async fn listen<H, F, R>(&mut self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F,
        F: Future<Output = R>,
        R: IntoReply,
    {
        if !self.is_running() {
            return Err(ServerError::Invocation {
                reason: "server has been shut down",
            });
        }

        let mut running = self.running.subscribe();
        let read_buffer_size = self.config.read_buffer_size;
        info!(address = %self.local_addr, "listening");

        while *running.borrow() {
            let listener = self.arm()?;

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = running.wait_for(|running| !*running) => break,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer, "connection accepted");
            serve_connection(stream, peer, &handler, read_buffer_size).await?;
        }

        self.shutdown_server();
        Ok(())
    }

    /// Stops the accept loop and closes the listening socket.
    ///
    /// Safe to call any number of times; only the first call does anything.
    /// Also runs when the server is dropped.
    pub fn shutdown_server(&mut self) {
        let was_running = self.running.send_replace(false);
        let socket = std::mem::replace(&mut self.socket, Socket::Closed);

        if was_running || !matches!(socket, Socket::Closed) {
            info!(address = %self.local_addr, "shutting down server");
        } else {
            debug!("server already shut down");
        }
        drop(socket);
    }

    // Moves the socket into the listening state; a no-op once listening.
    fn arm(&mut self) -> Result<&TcpListener, ServerError> {
        if matches!(self.socket, Socket::Bound(_)) {
            if let Socket::Bound(socket) = std::mem::replace(&mut self.socket, Socket::Closed) {
                match socket.listen(self.config.backlog) {
                    Ok(listener) => self.socket = Socket::Listening(listener),
                    Err(e) => {
                        self.running.send_replace(false);
                        return Err(e.into());
                    }
                }
            }
        }

        match &self.socket {
            Socket::Listening(listener) => Ok(listener),
            _ => Err(ServerError::Invocation {
                reason: "socket is closed",
            }),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown_server();
    }
}

fn validate_port(port: i64) -> Result<u16, ServerError> {
    u16::try_from(port)
        .ok()
        .filter(|&p| p != 0)
        .ok_or(ServerError::Port { port })
}

fn resolve(addr: &str) -> io::Result<SocketAddr> {
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
    })
}

/// Serves exactly one request on `stream`, then closes it.
///
/// Only handler failures are returned; transport errors end this connection
/// and are logged.
async fn serve_connection<H, F, R>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: &H,
    read_buffer_size: usize,
) -> Result<(), ServerError>
where
    H: Fn(Request) -> F,
    F: Future<Output = R>,
    R: IntoReply,
{
    let mut buf = vec![0u8; read_buffer_size];
    let bytes_read = match stream.read(&mut buf).await {
        Ok(0) => {
            debug!(peer = %peer, "connection closed before a request arrived");
            return Ok(());
        }
        Ok(n) => n,
        Err(e) => {
            warn!(peer = %peer, error = %e, "failed to read request");
            return Ok(());
        }
    };

    if bytes_read == read_buffer_size {
        debug!(
            peer = %peer,
            limit = read_buffer_size,
            "request filled the read buffer and may be truncated"
        );
    }

    let request = Request::parse(&buf[..bytes_read]);
    debug!(
        peer = %peer,
        method = %request.method(),
        uri = request.uri(),
        "dispatching request"
    );

    let response = match handler(request).await.into_reply() {
        Ok(Some(response)) => response,
        Ok(None) => {
            debug!(peer = %peer, "handler returned no response, sending 404");
            Response::error(StatusCode::NotFound)
        }
        Err(e) => return Err(ServerError::Handler(e)),
    };

    let status = response.status();
    let bytes = response.serialize();
    if let Err(e) = stream.write_all(&bytes).await {
        warn!(peer = %peer, error = %e, "failed to write response");
        return Ok(());
    }
    if let Err(e) = stream.shutdown().await {
        debug!(peer = %peer, error = %e, "error closing client connection");
    }

    debug!(peer = %peer, status, bytes = bytes.len(), "response sent");
    Ok(())
}
