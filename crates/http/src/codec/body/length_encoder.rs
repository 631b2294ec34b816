use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::protocol::{PayloadItem, SendError};

/// Writes a body of a declared length.
///
/// The encoder completes on its own once the declared number of bytes has
/// been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    remaining: u64,
    completed: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, remaining: length, completed: length == 0 }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Caps `available` at the bytes still owed.
    pub fn writable(&self, available: usize) -> usize {
        cmp::min(available as u64, self.remaining) as usize
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    /// # Errors
    ///
    /// - [`SendError::Completed`] once the body is complete
    /// - [`SendError::InvalidBody`] for bytes beyond the declared length, or
    ///   for an end of body with bytes still outstanding
    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.completed {
            return Err(SendError::Completed);
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    return Err(SendError::invalid_body(format!("{} bytes exceed the remaining content length {}", len, self.remaining)));
                }

                dst.put(bytes);
                self.remaining -= len;
                if self.remaining == 0 {
                    trace!(length = self.length, "length delimited body complete");
                    self.completed = true;
                }
            }
            PayloadItem::Eof => {
                if self.remaining > 0 {
                    return Err(SendError::invalid_body(format!(
                        "body ended {} bytes short of content length {}",
                        self.remaining, self.length
                    )));
                }
                self.completed = true;
            }
        }
        Ok(())
    }
}
