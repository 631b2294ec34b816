//! The HTTP/1.1 connection engine.
//!
//! A [`Connection`] sits between a non-blocking [`Session`](crate::session::Session)
//! and the code handling messages. It owns the session buffers, the head
//! parser and writer, and the body codec in flight for each direction.
//!
//! # Components
//!
//! - [`Connection`]: the engine, driven by read and write readiness
//! - [`Role`]: server or client side, see [`ServerConnection`] and [`ClientConnection`]
//! - [`InputEvent`] / [`OutputEvent`]: what a readiness call produced
//! - [`ConnectionMetrics`]: byte and message counters

#[allow(clippy::module_inception, reason = "the engine is the heart of this module")]
mod connection;
mod event;
mod metrics;
mod role;

pub use connection::{ClientConnection, Connection, ConnectionStatus, ServerConnection};
pub use event::{InputEvent, OutputEvent};
pub use metrics::ConnectionMetrics;
pub use role::{ClientRole, MessageKind, Role, ServerRole};
