use std::io;
use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

/// Outcome of filling the input buffer from the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Bytes appended to the buffer, `0` when the channel had nothing to offer
    Read(usize),
    /// The peer closed its side of the channel
    Eof,
}

/// Input side of a session: bytes read from the channel but not yet consumed.
#[derive(Debug)]
pub struct SessionInputBuffer {
    buffer: BytesMut,
    read_size: usize,
    eof: bool,
    transferred: u64,
}

impl SessionInputBuffer {
    /// Creates a buffer that reads at most `read_size` bytes per fill.
    pub fn with_capacity(read_size: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(read_size), read_size: read_size.max(1), eof: false, transferred: 0 }
    }

    /// Pulls available bytes from a non-blocking channel.
    ///
    /// `WouldBlock` is not an error here, it just yields `Fill::Read(0)`.
    /// Once end-of-stream has been seen it is remembered and every further
    /// fill reports [`Fill::Eof`] without touching the channel.
    pub fn fill<C: Read + ?Sized>(&mut self, channel: &mut C) -> io::Result<Fill> {
        if self.eof {
            return Ok(Fill::Eof);
        }

        let start = self.buffer.len();
        self.buffer.resize(start + self.read_size, 0);

        let result = loop {
            match channel.read(&mut self.buffer[start..]) {
                Ok(0) => {
                    self.eof = true;
                    break Ok(Fill::Eof);
                }
                Ok(n) => break Ok(Fill::Read(n)),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(Fill::Read(0)),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };

        let read = match result {
            Ok(Fill::Read(n)) => n,
            _ => 0,
        };
        self.buffer.truncate(start + read);
        self.transferred += read as u64;

        if read > 0 {
            trace!(read, buffered = self.buffer.len(), "filled input buffer");
        }
        result
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

    /// Whether the peer has closed its side of the channel.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Total bytes read from the channel.
    #[inline]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Drops every buffered byte.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
