use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::identity_encoder::IdentityEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, SendError, TransferCoding};

/// encode payload for an outgoing message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// body delimited by closing the connection
    Identity(IdentityEncoder),

    /// content-length payload
    Length(LengthEncoder),

    /// transfer-encoding chunked payload
    Chunked(ChunkedEncoder),
}

impl PayloadEncoder {
    pub fn new(coding: TransferCoding) -> Self {
        match coding {
            TransferCoding::Identity => Self::identity(),
            TransferCoding::Length(size) => Self::fix_length(size),
            TransferCoding::Chunked => Self::chunked(),
        }
    }

    pub fn identity() -> Self {
        Self { kind: Kind::Identity(IdentityEncoder::new()) }
    }

    /// create a chunked `PayloadEncoder`
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    /// create a fixed length `PayloadEncoder`
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub fn coding(&self) -> TransferCoding {
        match &self.kind {
            Kind::Identity(_) => TransferCoding::Identity,
            Kind::Length(encoder) => TransferCoding::Length(encoder.remaining()),
            Kind::Chunked(_) => TransferCoding::Chunked,
        }
    }

    pub fn is_completed(&self) -> bool {
        match &self.kind {
            Kind::Identity(encoder) => encoder.is_completed(),
            Kind::Length(encoder) => encoder.is_completed(),
            Kind::Chunked(encoder) => encoder.is_completed(),
        }
    }

    /// How many body bytes can be encoded into `available` bytes of output
    /// space without exceeding it.
    pub fn writable(&self, available: usize) -> usize {
        match &self.kind {
            Kind::Identity(encoder) => encoder.writable(available),
            Kind::Length(encoder) => encoder.writable(available),
            Kind::Chunked(encoder) => encoder.writable(available),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Identity(encoder) => encoder.encode(item, dst),
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::body::PayloadDecoder;
    use crate::config::Constraints;
    use tokio_util::codec::Decoder;

    const SIZES: [usize; 6] = [0, 1, 15, 16, 300, 5000];

    fn body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn encode(mut encoder: PayloadEncoder, body: &[u8], piece: usize) -> BytesMut {
        let mut dst = BytesMut::new();
        for chunk in body.chunks(piece) {
            encoder.encode(PayloadItem::Chunk(chunk), &mut dst).unwrap();
        }
        if !encoder.is_completed() {
            encoder.encode(PayloadItem::<&[u8]>::Eof, &mut dst).unwrap();
        }
        assert!(encoder.is_completed());
        dst
    }

    // the stream ends right after the encoded body
    fn decode(mut decoder: PayloadDecoder, mut src: BytesMut) -> Vec<u8> {
        let mut body = Vec::new();
        while let Some(item) = decoder.decode(&mut src).unwrap() {
            match item {
                PayloadItem::Chunk(bytes) => body.extend_from_slice(&bytes),
                PayloadItem::Eof => return body,
            }
        }
        loop {
            match decoder.decode_eof(&mut src).unwrap() {
                Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => return body,
                None => panic!("decoder stalled at end of stream"),
            }
        }
    }

    #[test]
    fn identity_round_trip() {
        for len in SIZES {
            let original = body(len);
            for piece in [1, 64, 4096] {
                let encoded = encode(PayloadEncoder::identity(), &original, piece);
                assert_eq!(decode(PayloadDecoder::identity(), encoded), original, "len {len}, piece {piece}");
            }
        }
    }

    #[test]
    fn length_round_trip() {
        for len in SIZES {
            let original = body(len);
            for piece in [1, 64, 4096] {
                let encoded = encode(PayloadEncoder::fix_length(len as u64), &original, piece);
                assert_eq!(encoded.len(), len);
                assert_eq!(decode(PayloadDecoder::fix_length(len as u64), encoded), original, "len {len}, piece {piece}");
            }
        }
    }

    #[test]
    fn chunked_round_trip() {
        for len in SIZES {
            let original = body(len);
            for piece in [1, 64, 4096] {
                let encoded = encode(PayloadEncoder::chunked(), &original, piece);
                assert!(encoded.ends_with(b"0\r\n\r\n"));
                let decoder = PayloadDecoder::chunked(Constraints::default());
                assert_eq!(decode(decoder, encoded), original, "len {len}, piece {piece}");
            }
        }
    }

    #[test]
    fn empty_chunked_body_is_only_the_last_chunk() {
        let encoded = encode(PayloadEncoder::chunked(), b"", 1);
        assert_eq!(&encoded[..], b"0\r\n\r\n");

        let mut decoder = PayloadDecoder::chunked(Constraints::default());
        let mut src = encoded;
        assert!(decoder.decode(&mut src).unwrap().unwrap().is_eof());
        assert!(decoder.is_completed());
        assert!(src.is_empty());
    }

    #[test]
    fn writable_matches_coding() {
        assert_eq!(PayloadEncoder::identity().writable(100), 100);
        assert_eq!(PayloadEncoder::fix_length(10).writable(100), 10);
        assert_eq!(PayloadEncoder::chunked().writable(100), 100 - crate::codec::body::CHUNK_OVERHEAD);
    }
}
