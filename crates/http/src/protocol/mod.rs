//! Core HTTP protocol abstractions.
//!
//! This module holds the message shells exchanged with the connection, the
//! payload items streamed through the content codecs, the framing rules that
//! select a transfer coding, and the error types.
//!
//! # Architecture
//!
//! - **Message Shells**
//!   - [`RequestHeader`]: request line plus headers, wrapping `http::Request<()>`
//!   - [`ResponseHead`]: status line plus headers, `http::Response<()>`
//!   - [`MessageHead`]: what the parser and writer need from either
//!
//! - **Payload**
//!   - [`PayloadItem`]: a body chunk or the end-of-body marker
//!   - [`TransferCoding`]: identity, length-delimited or chunked
//!
//! - **Framing** ([`framing`]): `Transfer-Encoding` / `Content-Length` rules
//!
//! - **Error Handling**
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: incoming side (protocol and truncation) errors
//!   - [`SendError`]: outgoing side errors
//!   - [`StateError`]: collaborator misuse

use http::{HeaderMap, Version};

mod message;
pub use message::PayloadItem;
pub use message::TransferCoding;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ReasonPhrase;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StateError;

pub mod framing;

/// The parts of a message shell shared by requests and responses.
pub trait MessageHead {
    fn version(&self) -> Version;

    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;
}
