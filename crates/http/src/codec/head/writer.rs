use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::head::head_line::{HeadLineFormatter, RequestLineFormatter, StatusLineFormatter};
use crate::protocol::{MessageHead, SendError};

/// Initial buffer size reserved for one serialized head
const INIT_HEAD_SIZE: usize = 1024;

pub type RequestWriter = MessageWriter<RequestLineFormatter>;
pub type ResponseWriter = MessageWriter<StatusLineFormatter>;

/// Serializes a message head: head line, one `name: value` line per header
/// in iteration order, then the blank line.
///
/// Iteration order is that of `HeaderMap`, which keeps repeated fields of
/// one name together. Fields interleaved with other names on the way in are
/// written grouped under the first occurrence of their name.
///
/// The head is written as is. Framing headers are the caller's business.
#[derive(Debug, Default, Clone)]
pub struct MessageWriter<F> {
    formatter: F,
}

impl<F: HeadLineFormatter> MessageWriter<F> {
    pub fn new(formatter: F) -> Self {
        Self { formatter }
    }

    /// Nothing is carried between messages, so there is nothing to clear.
    pub fn reset(&mut self) {}
}

impl<'a, F: HeadLineFormatter> Encoder<&'a F::Head> for MessageWriter<F> {
    type Error = SendError;

    fn encode(&mut self, head: &'a F::Head, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        dst.reserve(INIT_HEAD_SIZE);

        self.formatter.format_head_line(head, dst)?;

        for (name, value) in head.headers() {
            dst.put_slice(name.as_str().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        trace!(len = dst.len() - start, headers = head.headers().len(), "wrote message head");
        Ok(())
    }
}
