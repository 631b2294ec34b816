//! Session buffers decoupling the channel from message processing.
//!
//! - [`SessionInputBuffer`]: filled from the channel, consumed by the parser
//!   and the content decoders, line reads bounded by a max line length
//! - [`SessionOutputBuffer`]: filled by the writer and the content encoders,
//!   flushed to the channel
//!
//! Both buffers count the bytes that actually crossed the channel.

mod input;
mod line;
mod output;

pub use input::Fill;
pub use input::SessionInputBuffer;
pub use line::read_line;
pub use output::SessionOutputBuffer;
