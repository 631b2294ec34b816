//! Accumulation of raw header lines.
//!
//! Header fields are collected line by line before they are turned into
//! typed [`HeaderName`]/[`HeaderValue`] pairs. This is shared by the message
//! head parser and the trailer section of the chunked decoder, so both get
//! the same folding rules and the same limits.

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::Constraints;
use crate::ensure;
use crate::protocol::ParseError;

/// Raw header lines of one header block, in arrival order.
#[derive(Debug, Default)]
pub struct HeaderLines {
    lines: Vec<BytesMut>,
    constraints: Constraints,
}

impl HeaderLines {
    pub fn new(constraints: Constraints) -> Self {
        Self { lines: Vec::new(), constraints }
    }

    /// Adds one line (without terminator) to the block.
    ///
    /// A line starting with space or tab continues the previous header
    /// (obsolete line folding): the folding whitespace is collapsed into a
    /// single space.
    ///
    /// # Errors
    ///
    /// - [`ParseError::TooManyHeaders`] when a new header exceeds the max header count
    /// - [`ParseError::LineTooLong`] when a folded header exceeds the max line length
    /// - [`ParseError::InvalidHeader`] for a continuation line without a header to continue
    pub fn push_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        if matches!(line.first(), Some(b' ' | b'\t')) {
            let Some(previous) = self.lines.last_mut() else {
                return Err(ParseError::invalid_header("folded line without a preceding header"));
            };

            let continuation = line.trim_ascii_start();
            let kept = previous.trim_ascii_end().len();
            previous.truncate(kept);

            let max_len = self.constraints.max_line_length();
            ensure!(max_len == 0 || previous.len() + 1 + continuation.len() <= max_len, ParseError::line_too_long(max_len));

            previous.put_u8(b' ');
            previous.extend_from_slice(continuation);
            return Ok(());
        }

        let max_num = self.constraints.max_header_count();
        ensure!(max_num == 0 || self.lines.len() < max_num, ParseError::too_many_headers(max_num));

        self.lines.push(BytesMut::from(line));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Parses every accumulated line and appends it to `headers`. The
    /// accumulator is empty afterwards.
    ///
    /// `HeaderMap` groups values by name: names keep the order of their first
    /// appearance and each name's values keep arrival order, so `A, B, A`
    /// comes back as `A, A, B`.
    pub fn drain_into(&mut self, headers: &mut HeaderMap) -> Result<(), ParseError> {
        headers.reserve(self.lines.len());
        for line in self.lines.drain(..) {
            let (name, value) = parse_header_line(line.freeze())?;
            headers.append(name, value);
        }
        Ok(())
    }
}

/// Splits a `name: value` line, trimming optional whitespace around the value.
fn parse_header_line(line: Bytes) -> Result<(HeaderName, HeaderValue), ParseError> {
    let colon = line
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| ParseError::invalid_header(format!("missing colon in {:?}", String::from_utf8_lossy(&line))))?;

    let name = HeaderName::from_bytes(&line[..colon]).map_err(|e| ParseError::invalid_header(format!("invalid header name: {e}")))?;

    let raw = &line[colon + 1..];
    let start = colon + 1 + (raw.len() - raw.trim_ascii_start().len());
    let end = colon + 1 + raw.trim_ascii_end().len();
    let value = if start < end { line.slice(start..end) } else { Bytes::new() };

    let value = HeaderValue::from_maybe_shared(value).map_err(|e| ParseError::invalid_header(format!("invalid value of {name}: {e}")))?;

    Ok((name, value))
}
