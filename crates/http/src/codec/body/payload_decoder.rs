//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for the three ways a message body
//! can be delimited:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads running until the end of the stream
//!
//! The connection picks the strategy from the message's framing headers.

use bytes::BytesMut;
use http::HeaderMap;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::identity_decoder::IdentityDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::config::Constraints;
use crate::protocol::{ParseError, PayloadItem, TransferCoding};

/// A unified decoder for handling HTTP message payloads.
#[derive(Debug)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    /// Decode payload until the stream ends
    Identity(IdentityDecoder),

    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),
}

impl PayloadDecoder {
    pub fn new(coding: TransferCoding, constraints: Constraints) -> Self {
        match coding {
            TransferCoding::Identity => Self::identity(),
            TransferCoding::Length(size) => Self::fix_length(size),
            TransferCoding::Chunked => Self::chunked(constraints),
        }
    }

    pub fn identity() -> Self {
        Self { kind: Kind::Identity(IdentityDecoder::new()) }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked(constraints: Constraints) -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new(constraints)) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn coding(&self) -> TransferCoding {
        match &self.kind {
            Kind::Identity(_) => TransferCoding::Identity,
            Kind::Length(decoder) => TransferCoding::Length(decoder.remaining()),
            Kind::Chunked(_) => TransferCoding::Chunked,
        }
    }

    pub fn is_completed(&self) -> bool {
        match &self.kind {
            Kind::Identity(decoder) => decoder.is_completed(),
            Kind::Length(decoder) => decoder.is_completed(),
            Kind::Chunked(decoder) => decoder.is_completed(),
        }
    }

    /// Trailer fields of a completed chunked body.
    pub fn take_footers(&mut self) -> Option<HeaderMap> {
        match &mut self.kind {
            Kind::Chunked(decoder) if decoder.is_completed() => Some(decoder.take_footers()),
            _ => None,
        }
    }
}

/// Delegates to the decoder of the selected strategy.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Identity(decoder) => decoder.decode(src),
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Identity(decoder) => decoder.decode_eof(src),
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(decoder) => decoder.decode_eof(src),
        }
    }
}
