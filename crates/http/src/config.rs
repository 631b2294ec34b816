//! Connection configuration.
//!
//! All limits are injected when a connection is created; there is no
//! process-wide default instance to mutate.

use crate::codec::body::CHUNK_OVERHEAD;

/// Default size of a single read from the channel into the input buffer
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Smallest output capacity that still fits one chunk with a body byte.
pub const MIN_OUTPUT_BUFFER_SIZE: usize = CHUNK_OVERHEAD + 1;

/// Message limits enforced while parsing incoming heads and chunked trailers.
///
/// A limit of `0` means unbounded. Exceeding a limit is always reported as a
/// protocol error, data is never silently truncated or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    max_line_length: usize,
    max_header_count: usize,
}

impl Constraints {
    /// Constraints with no limits at all.
    pub const UNBOUNDED: Constraints = Constraints { max_line_length: 0, max_header_count: 0 };

    pub fn new(max_line_length: usize, max_header_count: usize) -> Self {
        Self { max_line_length, max_header_count }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn with_max_header_count(mut self, max_header_count: usize) -> Self {
        self.max_header_count = max_header_count;
        self
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    pub fn max_header_count(&self) -> usize {
        self.max_header_count
    }
}

/// Defaults to 8KB lines and 64 headers.
impl Default for Constraints {
    fn default() -> Self {
        Self { max_line_length: 8 * 1024, max_header_count: 64 }
    }
}

/// Configuration of a single connection.
///
/// `input_buffer_size` bounds a single fill of the input buffer from the
/// channel. `output_buffer_size` is the soft capacity of the output buffer:
/// message heads may exceed it, body writes never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    input_buffer_size: usize,
    output_buffer_size: usize,
    constraints: Constraints,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = size.max(1);
        self
    }

    /// Sizes below [`MIN_OUTPUT_BUFFER_SIZE`] are raised to it.
    pub fn with_output_buffer_size(mut self, size: usize) -> Self {
        self.output_buffer_size = size.max(MIN_OUTPUT_BUFFER_SIZE);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn input_buffer_size(&self) -> usize {
        self.input_buffer_size
    }

    pub fn output_buffer_size(&self) -> usize {
        self.output_buffer_size
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: DEFAULT_BUFFER_SIZE,
            output_buffer_size: DEFAULT_BUFFER_SIZE,
            constraints: Constraints::default(),
        }
    }
}
