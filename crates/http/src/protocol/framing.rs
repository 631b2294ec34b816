//! Message framing rules.
//!
//! Derives the [`TransferCoding`] of a message from its `Transfer-Encoding`
//! and `Content-Length` headers, see
//! [RFC 9112 section 6.3](https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length).

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue};

use crate::protocol::{ParseError, TransferCoding};

/// Determines the transfer coding of a message body from its headers.
///
/// A `Transfer-Encoding` whose final coding is `chunked` takes precedence over
/// `Content-Length`. When `close_delimited` is set (responses), a message
/// without usable framing headers is read until the channel closes; otherwise
/// (requests) it has no body and a non-chunked `Transfer-Encoding` is rejected.
///
/// Returns `Ok(None)` when the message carries no body.
pub fn body_coding(headers: &HeaderMap, close_delimited: bool) -> Result<Option<TransferCoding>, ParseError> {
    if headers.contains_key(TRANSFER_ENCODING) {
        if is_chunked(headers.get_all(TRANSFER_ENCODING).iter().last()) {
            return Ok(Some(TransferCoding::Chunked));
        }

        if close_delimited {
            return Ok(Some(TransferCoding::Identity));
        }

        return Err(ParseError::invalid_transfer_encoding("final transfer coding is not chunked"));
    }

    match content_length(headers)? {
        Some(0) => Ok(None),
        Some(length) => Ok(Some(TransferCoding::Length(length))),
        None if close_delimited => Ok(Some(TransferCoding::Identity)),
        None => Ok(None),
    }
}

/// Parses the `Content-Length` headers of a message.
///
/// Repeated headers or comma separated lists are accepted only when every
/// value is identical.
pub fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut length = None;

    for value in headers.get_all(CONTENT_LENGTH) {
        for item in value.as_bytes().split(|b| *b == b',') {
            let item = item.trim_ascii();
            if item.is_empty() || !item.iter().all(u8::is_ascii_digit) {
                return Err(ParseError::invalid_content_length(format!("value {} is not u64", String::from_utf8_lossy(item))));
            }

            // digits only, so the utf8 conversion can't fail; overflow can
            let parsed = std::str::from_utf8(item)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| ParseError::invalid_content_length("value overflows u64"))?;

            match length {
                Some(previous) if previous != parsed => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }
    }

    Ok(length)
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn check_is_chunked() {
        assert!(!is_chunked(None));
        assert!(is_chunked(Some(&HeaderValue::from_static("gzip, chunked"))));
        assert!(is_chunked(Some(&HeaderValue::from_static("Chunked"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("chunked, gzip"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("gzip"))));
    }

    #[test]
    fn chunked_takes_precedence_over_content_length() {
        let headers = headers(&[("Content-Length", "10"), ("Transfer-Encoding", "chunked")]);
        assert_eq!(body_coding(&headers, false).unwrap(), Some(TransferCoding::Chunked));
        assert_eq!(body_coding(&headers, true).unwrap(), Some(TransferCoding::Chunked));
    }

    #[test]
    fn last_transfer_encoding_header_decides() {
        let headers = headers(&[("Transfer-Encoding", "chunked"), ("Transfer-Encoding", "gzip")]);
        assert!(body_coding(&headers, false).is_err());
        assert_eq!(body_coding(&headers, true).unwrap(), Some(TransferCoding::Identity));
    }

    #[test]
    fn content_length_framing() {
        assert_eq!(body_coding(&headers(&[("Content-Length", "5")]), false).unwrap(), Some(TransferCoding::Length(5)));
        assert_eq!(body_coding(&headers(&[("Content-Length", "0")]), true).unwrap(), None);
        assert_eq!(body_coding(&headers(&[("Content-Length", "7, 7")]), false).unwrap(), Some(TransferCoding::Length(7)));
        assert_eq!(
            body_coding(&headers(&[("Content-Length", "7"), ("Content-Length", "7")]), false).unwrap(),
            Some(TransferCoding::Length(7))
        );
    }

    #[test]
    fn invalid_content_length() {
        assert!(content_length(&headers(&[("Content-Length", "+5")])).is_err());
        assert!(content_length(&headers(&[("Content-Length", "abc")])).is_err());
        assert!(content_length(&headers(&[("Content-Length", "5, 6")])).is_err());
        assert!(content_length(&headers(&[("Content-Length", "99999999999999999999999")])).is_err());
    }

    #[test]
    fn no_framing_headers() {
        assert_eq!(body_coding(&HeaderMap::new(), false).unwrap(), None);
        assert_eq!(body_coding(&HeaderMap::new(), true).unwrap(), Some(TransferCoding::Identity));
    }
}
