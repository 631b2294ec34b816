//! HTTP response header handling implementation.
//!
//! Responses use the standard `http::Response` type with an empty body
//! placeholder. The reason phrase read off the wire has no home in
//! `http::Response`, so it travels as a [`ReasonPhrase`] extension.

use bytes::Bytes;
use http::{HeaderMap, Response, Version};

use crate::protocol::MessageHead;

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = Response<()>;

/// The reason phrase of a status line.
///
/// Attached to the extensions of a parsed [`ResponseHead`]. When present on
/// an outgoing response it replaces the canonical reason of the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(Bytes);

impl ReasonPhrase {
    pub fn from_static(reason: &'static str) -> Self {
        Self(Bytes::from_static(reason.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for ReasonPhrase {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl MessageHead for ResponseHead {
    fn version(&self) -> Version {
        Response::version(self)
    }

    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }
}
