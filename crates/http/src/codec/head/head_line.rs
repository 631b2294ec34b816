//! Pluggable head-line strategies.
//!
//! The request line (`method target version`) and the status line
//! (`version status reason`) are the only parts in which requests and
//! responses differ on the wire, everything after them is shared.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::{Method, Request, Response, StatusCode, Uri, Version};
use httparse::Status;

use crate::protocol::{MessageHead, ParseError, ReasonPhrase, RequestHeader, ResponseHead, SendError};
use crate::utils::FastWrite;

/// Turns the first line of a message into an empty message shell.
pub trait HeadLineParser {
    type Head: MessageHead;

    /// `line` comes without its terminator.
    fn parse_head_line(&self, line: &[u8]) -> Result<Self::Head, ParseError>;
}

/// Writes the first line of a message, terminator included.
pub trait HeadLineFormatter {
    type Head: MessageHead;

    fn format_head_line(&self, head: &Self::Head, dst: &mut BytesMut) -> Result<(), SendError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLineParser;

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusLineParser;

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLineFormatter;

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusLineFormatter;

/// httparse wants a whole head, so the line is terminated as one without headers
fn as_empty_head(line: &[u8]) -> Vec<u8> {
    let mut head = Vec::with_capacity(line.len() + 4);
    head.extend_from_slice(line);
    head.extend_from_slice(b"\r\n\r\n");
    head
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // Currently HTTP/2 and HTTP/3 not supported
        v => Err(ParseError::InvalidVersion(v)),
    }
}

fn check_complete(status: Result<Status<usize>, httparse::Error>) -> Result<(), ParseError> {
    match status {
        Ok(Status::Complete(_)) => Ok(()),
        Ok(Status::Partial) => Err(ParseError::invalid_head_line("incomplete head line")),
        Err(e) => Err(ParseError::invalid_head_line(e)),
    }
}

impl HeadLineParser for RequestLineParser {
    type Head = RequestHeader;

    fn parse_head_line(&self, line: &[u8]) -> Result<RequestHeader, ParseError> {
        let head = as_empty_head(line);
        let mut req = httparse::Request::new(&mut []);
        check_complete(req.parse(&head))?;

        let method = req.method.ok_or_else(|| ParseError::invalid_head_line("missing method"))?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|e| ParseError::invalid_head_line(format!("invalid method: {e}")))?;

        let target = req.path.ok_or_else(|| ParseError::invalid_head_line("missing request target"))?;
        let uri = Uri::try_from(target).map_err(|e| ParseError::invalid_head_line(format!("invalid request target: {e}")))?;

        let version = parse_version(req.version)?;

        let mut request = Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;
        Ok(RequestHeader::from(request))
    }
}

impl HeadLineParser for StatusLineParser {
    type Head = ResponseHead;

    fn parse_head_line(&self, line: &[u8]) -> Result<ResponseHead, ParseError> {
        let head = as_empty_head(line);
        let mut resp = httparse::Response::new(&mut []);
        check_complete(resp.parse(&head))?;

        let version = parse_version(resp.version)?;

        let code = resp.code.ok_or_else(|| ParseError::invalid_head_line("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(|e| ParseError::invalid_head_line(format!("invalid status code: {e}")))?;

        let mut response = Response::new(());
        *response.status_mut() = status;
        *response.version_mut() = version;

        if let Some(reason) = resp.reason.filter(|reason| !reason.is_empty()) {
            response.extensions_mut().insert(ReasonPhrase::from(Bytes::copy_from_slice(reason.as_bytes())));
        }
        Ok(response)
    }
}

fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        v => Err(SendError::UnsupportedVersion(format!("{v:?}"))),
    }
}

impl HeadLineFormatter for RequestLineFormatter {
    type Head = RequestHeader;

    fn format_head_line(&self, head: &RequestHeader, dst: &mut BytesMut) -> Result<(), SendError> {
        let version = version_str(head.version())?;
        let uri = head.uri();

        dst.put_slice(head.method().as_str().as_bytes());
        dst.put_u8(b' ');
        if head.method() == Method::CONNECT {
            // authority-form
            let authority = uri.authority().ok_or_else(|| SendError::invalid_body("CONNECT request without authority"))?;
            dst.put_slice(authority.as_str().as_bytes());
        } else if uri.scheme().is_some() {
            // absolute-form, as sent to proxies
            write!(FastWrite(dst), "{uri}")?;
        } else {
            let target = uri.path_and_query().map_or("/", |path| path.as_str());
            dst.put_slice(target.as_bytes());
        }
        dst.put_u8(b' ');
        dst.put_slice(version.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

impl HeadLineFormatter for StatusLineFormatter {
    type Head = ResponseHead;

    fn format_head_line(&self, head: &ResponseHead, dst: &mut BytesMut) -> Result<(), SendError> {
        let version = version_str(head.version())?;

        write!(FastWrite(dst), "{} {} ", version, head.status().as_str())?;
        match head.extensions().get::<ReasonPhrase>() {
            Some(reason) => dst.put_slice(reason.as_bytes()),
            None => dst.put_slice(head.status().canonical_reason().unwrap_or("").as_bytes()),
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_line() {
        let head = RequestLineParser.parse_head_line(b"POST /index/?a=1&b=2 HTTP/1.0").unwrap();
        assert_eq!(head.method(), &Method::POST);
        assert_eq!(head.uri().path(), "/index/");
        assert_eq!(head.uri().query(), Some("a=1&b=2"));
        assert_eq!(head.version(), Version::HTTP_10);
        assert!(head.headers().is_empty());
    }

    #[test]
    fn parse_bad_request_lines() {
        assert!(matches!(RequestLineParser.parse_head_line(b"GET /"), Err(ParseError::InvalidHeadLine { .. })));
        assert!(matches!(RequestLineParser.parse_head_line(b"GET / HTTP/2.0"), Err(ParseError::InvalidHeadLine { .. })));
        assert!(matches!(RequestLineParser.parse_head_line(b"G(T / HTTP/1.1"), Err(ParseError::InvalidHeadLine { .. })));
        assert!(RequestLineParser.parse_head_line(b"").is_err());
    }

    #[test]
    fn parse_status_line() {
        let head = StatusLineParser.parse_head_line(b"HTTP/1.1 404 Nothing Here").unwrap();
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.extensions().get::<ReasonPhrase>().unwrap().as_bytes(), b"Nothing Here");

        let head = StatusLineParser.parse_head_line(b"HTTP/1.0 204 ").unwrap();
        assert_eq!(head.status(), StatusCode::NO_CONTENT);
        assert!(head.extensions().get::<ReasonPhrase>().is_none());

        assert!(StatusLineParser.parse_head_line(b"HTTP/1.1 abc OK").is_err());
        assert!(StatusLineParser.parse_head_line(b"ICY 200 OK").is_err());
    }

    #[test]
    fn format_request_lines() {
        let mut dst = BytesMut::new();
        let head = RequestHeader::from(Request::get("/path?q=1").body(()).unwrap());
        RequestLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"GET /path?q=1 HTTP/1.1\r\n");

        dst.clear();
        let head = RequestHeader::from(Request::get("http://example.test/a").body(()).unwrap());
        RequestLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"GET http://example.test/a HTTP/1.1\r\n");

        dst.clear();
        let head = RequestHeader::from(Request::connect("example.test:443").body(()).unwrap());
        RequestLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"CONNECT example.test:443 HTTP/1.1\r\n");
    }

    #[test]
    fn format_status_lines() {
        let mut dst = BytesMut::new();
        let head = Response::builder().status(StatusCode::OK).body(()).unwrap();
        StatusLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\n");

        dst.clear();
        let mut head = Response::builder().status(599).version(Version::HTTP_10).body(()).unwrap();
        StatusLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.0 599 \r\n");

        dst.clear();
        head.extensions_mut().insert(ReasonPhrase::from_static("Custom"));
        StatusLineFormatter.format_head_line(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.0 599 Custom\r\n");

        let head = Response::builder().version(Version::HTTP_2).body(()).unwrap();
        assert!(matches!(StatusLineFormatter.format_head_line(&head, &mut dst), Err(SendError::UnsupportedVersion(_))));
    }
}
