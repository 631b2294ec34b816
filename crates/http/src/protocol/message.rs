use bytes::{Buf, Bytes};

/// Represents an item in the HTTP message payload stream.
///
/// Decoders produce either data chunks or signal the end of the payload
/// stream (EOF); encoders accept the same items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// How a message delimits its body within the byte stream.
///
/// A message without a body has no transfer coding at all, so this is
/// usually carried as `Option<TransferCoding>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferCoding {
    /// Body runs until the channel reaches end-of-stream
    Identity,
    /// Body with known length in bytes
    Length(u64),
    /// Body using chunked transfer encoding
    Chunked,
}

impl TransferCoding {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, TransferCoding::Chunked)
    }

    /// Returns true if the payload is delimited by closing the connection
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, TransferCoding::Identity)
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    ///
    /// Returns None if this is an EOF marker
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    ///
    /// Returns None if this is an EOF marker
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
