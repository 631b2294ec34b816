//! Incremental parser for message heads.
//!
//! The parser is fed from the session input buffer and can be resumed at any
//! byte boundary: lines that are not complete yet stay in the buffer until
//! more bytes arrive.

use std::fmt;
use std::mem;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::buffer::read_line;
use crate::codec::head::head_line::{HeadLineParser, RequestLineParser, StatusLineParser};
use crate::codec::head::header_lines::HeaderLines;
use crate::config::Constraints;
use crate::protocol::{MessageHead, ParseError};

pub type RequestParser = MessageParser<RequestLineParser>;
pub type ResponseParser = MessageParser<StatusLineParser>;

enum State<H> {
    ReadHeadLine,
    ReadHeaders(H),
    Completed,
}

/// Parses one message head: the head line, the header block and the blank
/// line closing it.
///
/// Once a head has been returned the parser stays completed and yields
/// nothing until [`reset`](Self::reset) is called.
pub struct MessageParser<P: HeadLineParser> {
    head_line_parser: P,
    constraints: Constraints,
    state: State<P::Head>,
    lines: HeaderLines,
}

impl<P: HeadLineParser> MessageParser<P> {
    pub fn new(head_line_parser: P, constraints: Constraints) -> Self {
        Self { head_line_parser, constraints, state: State::ReadHeadLine, lines: HeaderLines::new(constraints) }
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, State::Completed)
    }

    /// Drops any partially parsed head and starts over with a head line.
    pub fn reset(&mut self) {
        self.state = State::ReadHeadLine;
        self.lines.clear();
    }

    fn parse(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<P::Head>, ParseError> {
        let max_line_length = self.constraints.max_line_length();

        loop {
            if self.is_completed() {
                return Ok(None);
            }

            let Some(line) = read_line(src, max_line_length, eof)? else {
                return match mem::replace(&mut self.state, State::ReadHeadLine) {
                    State::ReadHeaders(head) if eof => {
                        debug!(headers = self.lines.len(), "end of stream inside header block");
                        self.complete(head).map(Some)
                    }
                    state => {
                        self.state = state;
                        Ok(None)
                    }
                };
            };

            match mem::replace(&mut self.state, State::ReadHeadLine) {
                // empty lines ahead of a message are ignored
                State::ReadHeadLine if line.is_empty() => {}
                State::ReadHeadLine => {
                    let head = self.head_line_parser.parse_head_line(&line)?;
                    self.state = State::ReadHeaders(head);
                }
                State::ReadHeaders(head) if line.is_empty() => return self.complete(head).map(Some),
                State::ReadHeaders(head) => {
                    self.lines.push_line(&line)?;
                    self.state = State::ReadHeaders(head);
                }
                State::Completed => unreachable!("completed parser reads no lines"),
            }
        }
    }

    fn complete(&mut self, mut head: P::Head) -> Result<P::Head, ParseError> {
        self.lines.drain_into(head.headers_mut())?;
        self.state = State::Completed;
        trace!(version = ?head.version(), headers = head.headers().len(), "parsed message head");
        Ok(head)
    }
}

impl<P: HeadLineParser> fmt::Debug for MessageParser<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::ReadHeadLine => "ReadHeadLine",
            State::ReadHeaders(_) => "ReadHeaders",
            State::Completed => "Completed",
        };
        f.debug_struct("MessageParser")
            .field("state", &state)
            .field("constraints", &self.constraints)
            .field("header_lines", &self.lines.len())
            .finish_non_exhaustive()
    }
}

impl<P: HeadLineParser + Default> Default for MessageParser<P> {
    fn default() -> Self {
        Self::new(P::default(), Constraints::default())
    }
}

impl<P: HeadLineParser> Decoder for MessageParser<P> {
    type Item = P::Head;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.parse(src, false)
    }

    /// At end of stream a pending partial line is taken as the last line and
    /// a header block without its blank line is completed as it stands.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.parse(src, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ReasonPhrase, RequestHeader};
    use http::{Method, StatusCode, Version};
    use indoc::indoc;

    fn parse_all(parser: &mut RequestParser, bytes: &[u8]) -> RequestHeader {
        let mut src = BytesMut::from(bytes);
        parser.decode(&mut src).unwrap().unwrap()
    }

    #[test]
    fn parse_request_head() {
        let str = indoc! {r##"
        GET /index.html?lang=en HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        body"##};

        let mut src = BytesMut::from(str);
        let mut parser = RequestParser::default();
        let head = parser.decode(&mut src).unwrap().unwrap();

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.uri().path(), "/index.html");
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers().get("host").unwrap(), "127.0.0.1:8080");
        assert_eq!(head.headers().get("accept").unwrap(), "*/*");

        assert!(parser.is_completed());
        assert!(parser.decode(&mut src).unwrap().is_none());
        assert_eq!(&src[..], b"body");
    }

    #[test]
    fn split_anywhere() {
        let bytes = b"POST /upload HTTP/1.1\r\nHost: example.test\r\nContent-Length: 5\r\nX-Long:\r\n   continued\r\n\r\n";
        let expected = parse_all(&mut RequestParser::default(), bytes);

        for split in 1..bytes.len() {
            let mut parser = RequestParser::default();
            let mut src = BytesMut::from(&bytes[..split]);
            let first = parser.decode(&mut src).unwrap();
            assert!(first.is_none(), "head completed early at split {split}");

            src.extend_from_slice(&bytes[split..]);
            let head = parser.decode(&mut src).unwrap().unwrap();
            assert_eq!(head.uri(), expected.uri());
            assert_eq!(head.headers(), expected.headers());
            assert!(src.is_empty());
        }

        assert_eq!(expected.headers().get("x-long").unwrap(), "continued");
    }

    #[test]
    fn leading_empty_lines_are_skipped() {
        let mut parser = RequestParser::default();
        let head = parse_all(&mut parser, b"\r\n\r\nGET / HTTP/1.0\r\n\r\n");
        assert_eq!(head.version(), Version::HTTP_10);
        assert!(head.headers().is_empty());
    }

    #[test]
    fn limits_are_enforced() {
        let mut parser = RequestParser::new(RequestLineParser, Constraints::default().with_max_header_count(2));
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n"[..]);
        assert!(matches!(parser.decode(&mut src), Err(ParseError::TooManyHeaders { max_num: 2 })));

        let mut parser = RequestParser::new(RequestLineParser, Constraints::default().with_max_line_length(16));
        let mut src = BytesMut::from(&b"GET /a/very/long/path HTTP/1.1\r\n\r\n"[..]);
        assert!(matches!(parser.decode(&mut src), Err(ParseError::LineTooLong { max_len: 16 })));
    }

    #[test]
    fn unlimited_constraints() {
        let mut bytes = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..200 {
            bytes.extend_from_slice(format!("X-Header-{i}: {}\r\n", "v".repeat(100)).as_bytes());
        }
        bytes.extend_from_slice(b"\r\n");

        let mut parser = RequestParser::new(RequestLineParser, Constraints::UNBOUNDED);
        let head = parse_all(&mut parser, &bytes);
        assert_eq!(head.headers().len(), 200);
    }

    #[test]
    fn invalid_head_line() {
        let mut parser = RequestParser::default();
        let mut src = BytesMut::from(&b"NOT A REQUEST LINE\r\n\r\n"[..]);
        assert!(matches!(parser.decode(&mut src), Err(ParseError::InvalidHeadLine { .. })));
    }

    #[test]
    fn end_of_stream_completes_headers() {
        let mut parser = RequestParser::default();
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: a\r\nAccept: */*"[..]);
        assert!(parser.decode(&mut src).unwrap().is_none());

        let head = parser.decode_eof(&mut src).unwrap().unwrap();
        assert_eq!(head.headers().get("host").unwrap(), "a");
        assert_eq!(head.headers().get("accept").unwrap(), "*/*");
        assert!(src.is_empty());
    }

    #[test]
    fn end_of_stream_without_message() {
        let mut parser = RequestParser::default();
        let mut src = BytesMut::new();
        assert!(parser.decode_eof(&mut src).unwrap().is_none());
        assert!(!parser.is_completed());
    }

    #[test]
    fn reset_for_next_message() {
        let mut parser = RequestParser::default();
        let mut src = BytesMut::from(&b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"[..]);

        assert_eq!(parser.decode(&mut src).unwrap().unwrap().uri().path(), "/a");
        assert!(parser.decode(&mut src).unwrap().is_none());

        parser.reset();
        assert_eq!(parser.decode(&mut src).unwrap().unwrap().uri().path(), "/b");
    }

    #[test]
    fn parse_response_head() {
        let str = indoc! {r##"
        HTTP/1.1 200 Everything Fine
        Content-Type: text/plain
        Transfer-Encoding: chunked

        "##};

        let mut src = BytesMut::from(str);
        let mut parser = ResponseParser::default();
        let head = parser.decode(&mut src).unwrap().unwrap();

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.extensions().get::<ReasonPhrase>().unwrap().as_bytes(), b"Everything Fine");
        assert_eq!(head.headers().get("transfer-encoding").unwrap(), "chunked");
    }

    #[test]
    fn debug_shows_progress() {
        let mut parser = RequestParser::default();
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: x\r\n"[..]);
        assert!(parser.decode(&mut src).unwrap().is_none());

        let debug = format!("{parser:?}");
        assert!(debug.starts_with("MessageParser"));
        assert!(debug.contains("state: \"ReadHeaders\""));
        assert!(debug.contains("header_lines: 1"));
    }
}
