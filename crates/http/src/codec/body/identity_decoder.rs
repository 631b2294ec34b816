//! Decoder for bodies delimited by the end of the stream.
//!
//! Used for responses that declare neither `Content-Length` nor a chunked
//! `Transfer-Encoding`: everything up to end-of-stream is entity data.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDecoder {
    received: u64,
    completed: bool,
}

impl IdentityDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes only once the channel has reached end-of-stream.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Decoder for IdentityDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.completed {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let bytes = src.split().freeze();
        self.received += bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                trace!(received = self.received, "identity body ended with the stream");
                self.completed = true;
                Ok(Some(PayloadItem::Eof))
            }
        }
    }
}
