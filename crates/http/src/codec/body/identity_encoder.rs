use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};

/// Passes body bytes through unchanged.
///
/// The body ends where the connection does, so completing it only marks the
/// encoder done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityEncoder {
    completed: bool,
}

impl IdentityEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// How many body bytes fit into `available` bytes of output space.
    pub fn writable(&self, available: usize) -> usize {
        available
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for IdentityEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.completed {
            return Err(SendError::Completed);
        }

        match item {
            PayloadItem::Chunk(bytes) => dst.put(bytes),
            PayloadItem::Eof => self.completed = true,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through() {
        let mut encoder = IdentityEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(&b"raw "[..]), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(&b"bytes"[..]), &mut dst).unwrap();
        encoder.encode(PayloadItem::<&[u8]>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"raw bytes");
        assert!(encoder.is_completed());
        assert!(matches!(encoder.encode(PayloadItem::Chunk(&b"late"[..]), &mut dst), Err(SendError::Completed)));
    }
}
