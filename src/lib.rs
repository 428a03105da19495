//! # barehttp
//!
//! A minimal HTTP/1.x server built directly on stream sockets. It accepts one
//! client at a time, parses the request from a single bounded read, hands it
//! to a handler, and writes the serialized response before closing the
//! connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use barehttp::server::Server;
//! use barehttp::http::{Request, Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1", 8000)?;
//!     server.listen(|req: Request| async move {
//!         match req.param("name") {
//!             Some(name) => Some(Response::new(format!("Hello, {name}!"), StatusCode::Ok)),
//!             None => None, // answered with 404
//!         }
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod echo;
pub mod http;
pub mod server;

pub use http::{Headers, IntoReply, Method, Request, Response, StatusCode};
pub use server::{Server, ServerConfig, ServerError, ShutdownHandle};
