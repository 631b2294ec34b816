use std::io;
use std::io::{ErrorKind, Write};

use bytes::{Buf, BytesMut};
use tracing::trace;

/// Output side of a session: bytes produced for the channel but not yet written.
///
/// The capacity is soft. Message heads are always written in full, body
/// encoders ask for [`available`](Self::available) and stay within it.
#[derive(Debug)]
pub struct SessionOutputBuffer {
    buffer: BytesMut,
    capacity: usize,
    transferred: u64,
}

impl SessionOutputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity), capacity, transferred: 0 }
    }

    /// Writes buffered bytes to a non-blocking channel until it stops
    /// accepting them or the buffer is empty.
    ///
    /// Returns the number of bytes written by this call.
    pub fn flush<C: Write + ?Sized>(&mut self, channel: &mut C) -> io::Result<usize> {
        let mut written = 0;

        while !self.buffer.is_empty() {
            match channel.write(&self.buffer) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => {
                    self.buffer.advance(n);
                    self.transferred += n as u64;
                    written += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if self.buffer.is_empty() {
            match channel.flush() {
                Err(e) if e.kind() != ErrorKind::WouldBlock => return Err(e),
                _ => {}
            }
        }

        if written > 0 {
            trace!(written, remaining = self.buffer.len(), "flushed output buffer");
        }
        Ok(written)
    }

    /// Free space left below the soft capacity.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.buffer.len())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.buffer.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes written to the channel.
    #[inline]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `limit` bytes in total, then blocks.
    struct Throttled {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for Throttled {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.written.len();
            if room == 0 {
                return Err(io::Error::from(ErrorKind::WouldBlock));
            }
            let n = room.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_flush() {
        let mut channel = Throttled { written: Vec::new(), limit: 4 };
        let mut buffer = SessionOutputBuffer::with_capacity(16);
        buffer.buffer_mut().extend_from_slice(b"0123456789");
        assert_eq!(buffer.available(), 6);

        assert_eq!(buffer.flush(&mut channel).unwrap(), 4);
        assert_eq!(&channel.written[..], b"0123");
        assert_eq!(buffer.len(), 6);
        assert!(buffer.has_data());

        channel.limit = 100;
        assert_eq!(buffer.flush(&mut channel).unwrap(), 6);
        assert_eq!(&channel.written[..], b"0123456789");
        assert!(!buffer.has_data());
        assert_eq!(buffer.transferred(), 10);
    }

    #[test]
    fn head_may_exceed_capacity() {
        let mut buffer = SessionOutputBuffer::with_capacity(4);
        buffer.buffer_mut().extend_from_slice(b"HTTP/1.1 200 OK\r\n");
        assert_eq!(buffer.available(), 0);
    }
}
