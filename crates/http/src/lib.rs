//! A non-blocking HTTP/1.1 message engine
//!
//! This crate parses and writes HTTP/1.1 messages over a non-blocking byte
//! channel without ever waiting for I/O itself. Whoever owns the socket
//! signals read and write readiness, the engine moves as many bytes as it can
//! and reports what happened as an event.
//!
//! # Features
//!
//! - Incremental head parsing, resumable at any byte boundary
//! - Obsolete header line folding, line length and header count limits
//! - Identity, length-delimited and chunked bodies, including chunk trailers
//! - One engine for both sides of a connection, see [`connection::Role`]
//! - Bounded output buffer, body writes never outrun the channel
//! - A small tokio adapter to run connections over TCP
//!
//! # Example
//!
//! ```no_run
//! use http::{header, Response, StatusCode};
//! use nio_http::config::ConnectionConfig;
//! use nio_http::connection::{Connection, ServerRole};
//! use nio_http::protocol::RequestHeader;
//! use nio_http::reactor::{drive, Handler, TcpSession};
//! use tokio::net::TcpListener;
//!
//! struct Hello;
//!
//! impl Handler<ServerRole> for Hello {
//!     fn message_received(&mut self, connection: &mut Connection<TcpSession, ServerRole>, _head: RequestHeader) {
//!         let body = b"Hello World!\r\n";
//!         let response = Response::builder()
//!             .status(StatusCode::OK)
//!             .header(header::CONTENT_LENGTH, body.len())
//!             .body(())
//!             .unwrap();
//!
//!         connection.submit_response(&response).unwrap();
//!         connection.write_body(&mut &body[..]).unwrap();
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         tokio::spawn(async move {
//!             let session = TcpSession::new(stream)?;
//!             drive::<ServerRole, _>(session, ConnectionConfig::default(), &mut Hello).await
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: session input and output buffers, line reading
//! - [`codec`]: head parser and writer, transfer-coding decoders and encoders
//! - [`connection`]: the per-connection state machine
//! - [`session`]: what the engine needs from the reactor
//! - [`reactor`]: tokio implementation of a session and a driving loop
//! - [`protocol`]: message shells, payload items, framing rules, errors
//! - [`config`]: buffer sizes and parser limits
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS, no keep-alive policy, no request routing

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod reactor;
pub mod session;

mod utils;
pub(crate) use utils::ensure;
