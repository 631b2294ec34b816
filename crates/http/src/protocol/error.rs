use std::io;
use thiserror::Error;

/// Top-level error reported by a connection.
///
/// The variants follow the failure classes of the engine: protocol and
/// truncation problems on the incoming side ([`ParseError`]), problems on
/// the outgoing side ([`SendError`]) and collaborator misuse ([`StateError`]).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("illegal state: {source}")]
    State {
        #[from]
        source: StateError,
    },
}

impl HttpError {
    /// Malformed input from the peer, reported per exchange.
    pub fn is_protocol(&self) -> bool {
        matches!(self, HttpError::Parse { source } if source.is_protocol())
    }

    /// The peer closed the channel before a declared body was complete.
    pub fn is_truncation(&self) -> bool {
        matches!(self, HttpError::Parse { source } if source.is_truncation())
    }

    /// Channel failure; the connection should be considered unusable.
    pub fn is_io(&self) -> bool {
        matches!(self, HttpError::Parse { source: ParseError::Io { .. } } | HttpError::Send { source: SendError::Io { .. } })
    }

    /// A collaborator used the connection or a codec in a way its state does not allow.
    pub fn is_usage(&self) -> bool {
        matches!(self, HttpError::State { .. } | HttpError::Send { source: SendError::Completed })
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line length exceed the limit {max_len}")]
    LineTooLong { max_len: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid head line: {reason}")]
    InvalidHeadLine { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid transfer-encoding header: {reason}")]
    InvalidTransferEncoding { reason: String },

    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: String },

    #[error("truncated chunk, expected size: {expected}, actual size: {actual}")]
    TruncatedChunk { expected: u64, actual: u64 },

    #[error("connection closed prematurely, expected content length: {expected}, received: {received}")]
    ConnectionClosedPrematurely { expected: u64, received: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn line_too_long(max_len: usize) -> Self {
        Self::LineTooLong { max_len }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_head_line<S: ToString>(str: S) -> Self {
        Self::InvalidHeadLine { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::InvalidTransferEncoding { reason: str.to_string() }
    }

    pub fn malformed_chunk<S: ToString>(str: S) -> Self {
        Self::MalformedChunk { reason: str.to_string() }
    }

    pub fn truncated_chunk(expected: u64, actual: u64) -> Self {
        Self::TruncatedChunk { expected, actual }
    }

    pub fn closed_prematurely(expected: u64, received: u64) -> Self {
        Self::ConnectionClosedPrematurely { expected, received }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedChunk { .. } | Self::ConnectionClosedPrematurely { .. })
    }

    pub fn is_protocol(&self) -> bool {
        !self.is_truncation() && !matches!(self, Self::Io { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported http version: {0}")]
    UnsupportedVersion(String),

    #[error("content encoder already completed")]
    Completed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("{0} already submitted")]
    AlreadySubmitted(&'static str),

    #[error("connection is not open")]
    NotActive,

    #[error("no message body in progress")]
    NoBodyInProgress,
}
