//! Message head codec.
//!
//! [`MessageParser`] turns the head of an incoming message into a shell,
//! [`MessageWriter`] does the inverse for outgoing messages. Both are
//! parameterized by the head-line strategy, which is the only part in which
//! requests and responses differ.

mod head_line;
mod header_lines;
mod parser;
mod writer;

pub use head_line::{HeadLineFormatter, HeadLineParser};
pub use head_line::{RequestLineFormatter, RequestLineParser, StatusLineFormatter, StatusLineParser};
pub use header_lines::HeaderLines;
pub use parser::{MessageParser, RequestParser, ResponseParser};
pub use writer::{MessageWriter, RequestWriter, ResponseWriter};
