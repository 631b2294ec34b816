use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::protocol::{PayloadItem, SendError};
use crate::utils::FastWrite;

/// Room kept free in the output buffer for the size line and the CRLF
/// around one chunk.
pub const CHUNK_OVERHEAD: usize = 12;

/// Writes each non-empty body write as one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedEncoder {
    completed: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn writable(&self, available: usize) -> usize {
        available.saturating_sub(CHUNK_OVERHEAD)
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.completed {
            return Err(SendError::Completed);
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(FastWrite(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                dst.put(bytes);
                dst.put_slice(b"\r\n");
            }
            PayloadItem::Eof => {
                trace!("write last chunk");
                self.completed = true;
                dst.put_slice(b"0\r\n\r\n");
            }
        }
        Ok(())
    }
}
