//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module provides functionality to decode HTTP messages that use chunked transfer encoding
//! as specified in [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! The chunked encoding allows the sender to transmit message data in a series of chunks,
//! indicating the size of each chunk before its data. The last chunk may be
//! followed by trailer fields, which are kept as footers.

use std::mem;
use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

use crate::buffer::read_line;
use crate::codec::head::HeaderLines;
use crate::config::Constraints;
use crate::protocol::{ParseError, PayloadItem};

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions (ignored) and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk indicates the end of the data, trailer fields and a
///   blank line follow
///
/// The size line is bounded by the max line length, the trailer section by
/// the same limits as a header block.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    chunk_size: u64,
    remaining_size: u64,
    size_line_len: usize,
    constraints: Constraints,
    trailers: HeaderLines,
    footers: HeaderMap,
}

impl ChunkedDecoder {
    pub fn new(constraints: Constraints) -> Self {
        Self {
            state: Size,
            chunk_size: 0,
            remaining_size: 0,
            size_line_len: 0,
            constraints,
            trailers: HeaderLines::new(constraints),
            footers: HeaderMap::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == End
    }

    /// Trailer fields received after the last chunk, empty until completed.
    pub fn footers(&self) -> &HeaderMap {
        &self.footers
    }

    pub fn take_footers(&mut self) -> HeaderMap {
        mem::take(&mut self.footers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read trailer lines up to the blank line
    Trailers,
    /// Final state after reading last chunk
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` once the last chunk and the trailers are read
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }

    /// # Errors
    ///
    /// - [`ParseError::TruncatedChunk`] when the stream ends inside chunk data
    /// - [`ParseError::MalformedChunk`] when it ends anywhere else before the
    ///   closing chunk and trailers
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        match self.state {
            Body => Err(ParseError::truncated_chunk(self.chunk_size, self.chunk_size - self.remaining_size)),
            _ => Err(ParseError::malformed_chunk("closing chunk expected")),
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedDecoder {
    /// Processes the next step in the chunked decoding state machine.
    ///
    /// Also keeps track of the size line: its length is bounded by the max
    /// line length, and once it is complete the chunk size is known.
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        let next = match self.state {
            Size => ChunkedState::read_size(src, &mut self.remaining_size, self.size_line_len == 0),
            SizeLws => ChunkedState::read_size_lws(src, self.remaining_size),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, self.remaining_size),
            Body => ChunkedState::read_body(src, &mut self.remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailers => self.read_trailers(src),
            End => Poll::Ready(Ok(End)),
        };

        let Poll::Ready(Ok(next)) = next else {
            return next;
        };

        if self.state.in_size_line() {
            if matches!(next, Size | SizeLws | Extension) {
                self.size_line_len += 1;
                let max_len = self.constraints.max_line_length();
                if max_len != 0 && self.size_line_len > max_len {
                    return Poll::Ready(Err(ParseError::line_too_long(max_len)));
                }
            } else if next != SizeLf {
                self.chunk_size = self.remaining_size;
                self.size_line_len = 0;
                trace!(chunk_size = self.chunk_size, "read chunk size line");
            }
        }

        Poll::Ready(Ok(next))
    }

    /// Reads trailer lines, which follow the same folding rules and limits
    /// as a header block, until the blank line.
    fn read_trailers(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        loop {
            let Some(line) = read_line(src, self.constraints.max_line_length(), false)? else {
                return Poll::Pending;
            };

            if line.is_empty() {
                self.trailers.drain_into(&mut self.footers)?;
                return Poll::Ready(Ok(End));
            }
            self.trailers.push_line(&line)?;
        }
    }
}

impl ChunkedState {
    fn in_size_line(self) -> bool {
        matches!(self, Size | SizeLws | Extension | SizeLf)
    }

    /// Reads and parses the chunk size in hexadecimal format.
    ///
    /// The size is read digit by digit until a delimiter is encountered.
    /// Supports both uppercase and lowercase hex digits.
    ///
    /// # State Transitions
    /// - On hex digit (0-9, a-f, A-F): Stay in Size state to read more digits
    /// - On whitespace (tab/space): Transition to SizeLws state
    /// - On semicolon: Transition to Extension state to handle chunk extensions
    /// - On CR: Transition to SizeLf state to finish size line
    /// - On LF: the size line is complete
    /// - On invalid character: Return error
    fn read_size(src: &mut BytesMut, size_per_chunk: &mut u64, first: bool) -> Poll<Result<ChunkedState, ParseError>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => return Poll::Ready(Err(ParseError::malformed_chunk("chunk size overflow"))),
                }
            };
        }

        let radix = 16;
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            _ if first => return Poll::Ready(Err(ParseError::malformed_chunk("missing chunk size"))),
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            b'\n' => return Poll::Ready(Ok(ChunkedState::after_size_line(*size_per_chunk))),
            b => return Poll::Ready(Err(ParseError::malformed_chunk(format!("invalid chunk size byte {b:#04x}")))),
        };

        *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
        *size_per_chunk = or_overflow!(size_per_chunk.checked_add(digit as u64));
        Poll::Ready(Ok(Size))
    }

    /// Processes linear whitespace (LWS) after the chunk size.
    ///
    /// State transitions:
    /// - On tab/space: Stay in SizeLws state to handle more whitespace
    /// - On semicolon: Move to Extension state to process chunk extensions
    /// - On CR: Move to SizeLf state to finish size line
    /// - On LF: the size line is complete
    /// - On invalid char: Return error
    fn read_size_lws(src: &mut BytesMut, size_per_chunk: u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Ok(ChunkedState::after_size_line(size_per_chunk))),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size linear white space"))),
        }
    }

    /// Skips chunk extensions, they end at the line terminator.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            // a plain LF inside extensions is rejected
            b'\n' => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk extension contains newline"))),
            _ => Poll::Ready(Ok(Extension)), // no supported extensions
        }
    }

    /// Validates the LF byte after the chunk size line.
    ///
    /// # State Transitions
    /// - On LF with size 0: the last chunk, move to Trailers
    /// - On LF with size > 0: Move to Body state to read chunk data
    /// - On any other byte: Return error
    fn read_size_lf(src: &mut BytesMut, size_per_chunk: u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(ChunkedState::after_size_line(size_per_chunk))),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size LF"))),
        }
    }

    fn after_size_line(size: u64) -> ChunkedState {
        if size == 0 { Trailers } else { Body }
    }

    /// Reads the actual chunk data bytes.
    ///
    /// # State Transitions
    /// - After reading data with remaining size > 0: Stay in Body state
    /// - After reading data with remaining size = 0: Move to BodyCr state
    fn read_body(src: &mut BytesMut, size_per_chunk: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Pending;
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = match *size_per_chunk {
            r if r > usize::MAX as u64 => usize::MAX,
            r => r as usize,
        };

        let read_size = std::cmp::min(remaining, src.len());

        *size_per_chunk -= read_size as u64;
        let bytes = src.split_to(read_size).freeze();
        *buf = Some(bytes);

        if *size_per_chunk > 0 {
            Poll::Ready(Ok(Body))
        } else {
            Poll::Ready(Ok(BodyCr))
        }
    }

    /// Validates the CRLF after chunk data, a bare LF is tolerated.
    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("CRLF expected at end of chunk"))),
        }
    }

    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("CRLF expected at end of chunk"))),
        }
    }
}
