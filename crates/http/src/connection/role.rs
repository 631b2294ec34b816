//! Server and client sides of a connection.
//!
//! Both sides run the same engine. A [`Role`] decides which shell type is
//! parsed and which one is written, and which of those messages carry a body.

use std::collections::VecDeque;
use std::fmt;

use http::{Method, StatusCode};

use crate::codec::head::{HeadLineFormatter, HeadLineParser};
use crate::codec::head::{RequestLineFormatter, RequestLineParser, StatusLineFormatter, StatusLineParser};
use crate::protocol::framing;
use crate::protocol::{MessageHead, ParseError, RequestHeader, ResponseHead, SendError, TransferCoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Role {
    type Incoming: MessageHead;
    type Outgoing: MessageHead;
    type Parser: HeadLineParser<Head = Self::Incoming> + Default;
    type Formatter: HeadLineFormatter<Head = Self::Outgoing> + Default;

    const INCOMING: MessageKind;
    const OUTGOING: MessageKind;

    /// Transfer coding of a received message, `None` if it has no body.
    fn incoming_coding(&mut self, head: &Self::Incoming) -> Result<Option<TransferCoding>, ParseError>;

    /// Transfer coding of a message about to be sent, `None` if it has no body.
    fn outgoing_coding(&mut self, head: &Self::Outgoing) -> Result<Option<TransferCoding>, SendError>;
}

/// Receives requests, sends responses.
///
/// Request methods are remembered until answered, so that responses to
/// `HEAD` and `CONNECT` are written without a body.
#[derive(Debug, Default)]
pub struct ServerRole {
    pending: VecDeque<Method>,
}

/// Sends requests, receives responses.
#[derive(Debug, Default)]
pub struct ClientRole {
    pending: VecDeque<Method>,
}

/// Responses that never enclose a body, whatever their headers say.
fn response_without_body(method: Option<&Method>, status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || method == Some(&Method::HEAD)
        || (method == Some(&Method::CONNECT) && status.is_success())
}

/// Pops the request a response answers, 1xx responses answer nothing yet.
fn answered_method(pending: &mut VecDeque<Method>, status: StatusCode) -> Option<Method> {
    if status.is_informational() {
        pending.front().cloned()
    } else {
        pending.pop_front()
    }
}

impl Role for ServerRole {
    type Incoming = RequestHeader;
    type Outgoing = ResponseHead;
    type Parser = RequestLineParser;
    type Formatter = StatusLineFormatter;

    const INCOMING: MessageKind = MessageKind::Request;
    const OUTGOING: MessageKind = MessageKind::Response;

    fn incoming_coding(&mut self, head: &RequestHeader) -> Result<Option<TransferCoding>, ParseError> {
        self.pending.push_back(head.method().clone());
        framing::body_coding(head.headers(), false)
    }

    fn outgoing_coding(&mut self, head: &ResponseHead) -> Result<Option<TransferCoding>, SendError> {
        let method = answered_method(&mut self.pending, head.status());
        if response_without_body(method.as_ref(), head.status()) {
            return Ok(None);
        }
        framing::body_coding(head.headers(), true).map_err(SendError::invalid_body)
    }
}

impl Role for ClientRole {
    type Incoming = ResponseHead;
    type Outgoing = RequestHeader;
    type Parser = StatusLineParser;
    type Formatter = RequestLineFormatter;

    const INCOMING: MessageKind = MessageKind::Response;
    const OUTGOING: MessageKind = MessageKind::Request;

    fn incoming_coding(&mut self, head: &ResponseHead) -> Result<Option<TransferCoding>, ParseError> {
        let method = answered_method(&mut self.pending, head.status());
        if response_without_body(method.as_ref(), head.status()) {
            return Ok(None);
        }
        framing::body_coding(head.headers(), true)
    }

    fn outgoing_coding(&mut self, head: &RequestHeader) -> Result<Option<TransferCoding>, SendError> {
        let coding = framing::body_coding(head.headers(), false).map_err(SendError::invalid_body)?;
        self.pending.push_back(head.method().clone());
        Ok(coding)
    }
}
