//! The I/O session a connection is bound to.
//!
//! A session is owned by the reactor: it wraps a non-blocking byte channel,
//! keeps the event interest the reactor should watch for, and carries a few
//! pieces of per-socket state. The connection only ever talks to the session
//! through this trait.

use std::fmt;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::ops::{BitOr, BitOrAssign};
use std::time::Duration;

use http::Extensions;

/// Set of I/O events a reactor watches a session for.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const READ: EventMask = EventMask(0b01);
    pub const WRITE: EventMask = EventMask(0b10);

    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: EventMask) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: EventMask) {
        self.0 &= !other.0;
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::READ), self.contains(Self::WRITE)) {
            (true, true) => f.write_str("READ | WRITE"),
            (true, false) => f.write_str("READ"),
            (false, true) => f.write_str("WRITE"),
            (false, false) => f.write_str("NONE"),
        }
    }
}

/// A non-blocking byte channel plus the reactor-side state around it.
///
/// Reads and writes on [`channel`](Session::channel) must not block:
/// `WouldBlock` means no bytes right now, a read of `Ok(0)` means the peer
/// closed its side.
pub trait Session {
    type Channel: Read + Write;

    fn channel(&mut self) -> &mut Self::Channel;

    fn event_mask(&self) -> EventMask;

    /// Adds to the event interest.
    fn set_event(&mut self, event: EventMask);

    /// Removes from the event interest.
    fn clear_event(&mut self, event: EventMask);

    /// Per-session attribute store.
    fn attributes(&mut self) -> &mut Extensions;

    fn socket_timeout(&self) -> Option<Duration>;

    fn set_socket_timeout(&mut self, timeout: Option<Duration>);

    /// Graceful close.
    fn close(&mut self);

    /// Immediate close.
    fn shutdown(&mut self);

    fn is_closed(&self) -> bool;

    fn local_addr(&self) -> Option<SocketAddr>;

    fn remote_addr(&self) -> Option<SocketAddr>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::io;
    use std::io::ErrorKind;

    use super::*;

    /// In-memory channel: reads hand out the scripted input one piece at a
    /// time, writes collect into a vector.
    #[derive(Debug, Default)]
    pub struct MockChannel {
        input: VecDeque<Vec<u8>>,
        input_closed: bool,
        output: Vec<u8>,
        write_limit: Option<usize>,
    }

    impl Read for MockChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut piece) = self.input.pop_front() else {
                return if self.input_closed { Ok(0) } else { Err(io::Error::from(ErrorKind::WouldBlock)) };
            };

            let n = piece.len().min(buf.len());
            buf[..n].copy_from_slice(&piece[..n]);
            if n < piece.len() {
                self.input.push_front(piece.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for MockChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.write_limit {
                Some(0) => return Err(io::Error::from(ErrorKind::WouldBlock)),
                Some(limit) => limit.min(buf.len()),
                None => buf.len(),
            };
            if let Some(limit) = self.write_limit.as_mut() {
                *limit -= n;
            }
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockSession {
        channel: MockChannel,
        events: EventMask,
        attributes: Extensions,
        timeout: Option<Duration>,
        closed: bool,
        shut_down: bool,
    }

    impl MockSession {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues bytes to be handed out by exactly one read.
        pub fn push_input(&mut self, bytes: &[u8]) {
            self.channel.input.push_back(bytes.to_vec());
        }

        /// The peer closes its side once the queued input is read.
        pub fn close_input(&mut self) {
            self.channel.input_closed = true;
        }

        /// Accept at most `limit` more bytes before writes block.
        pub fn set_write_limit(&mut self, limit: Option<usize>) {
            self.channel.write_limit = limit;
        }

        pub fn written(&self) -> &[u8] {
            &self.channel.output
        }

        pub fn take_written(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.channel.output)
        }

        pub fn is_shut_down(&self) -> bool {
            self.shut_down
        }
    }

    impl Session for MockSession {
        type Channel = MockChannel;

        fn channel(&mut self) -> &mut MockChannel {
            &mut self.channel
        }

        fn event_mask(&self) -> EventMask {
            self.events
        }

        fn set_event(&mut self, event: EventMask) {
            self.events.insert(event);
        }

        fn clear_event(&mut self, event: EventMask) {
            self.events.remove(event);
        }

        fn attributes(&mut self) -> &mut Extensions {
            &mut self.attributes
        }

        fn socket_timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
            self.timeout = timeout;
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn shutdown(&mut self) {
            self.closed = true;
            self.shut_down = true;
        }

        fn is_closed(&self) -> bool {
            self.closed
        }

        fn local_addr(&self) -> Option<SocketAddr> {
            None
        }

        fn remote_addr(&self) -> Option<SocketAddr> {
            None
        }
    }
}
