//! HTTP body handling module for processing request and response payloads
//!
//! This module provides functionality for encoding and decoding HTTP message bodies
//! using different transfer strategies.
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: Handles chunked transfer encoded payloads, trailers included
//! - [`LengthDecoder`]: Processes fixed-length payloads
//! - [`IdentityDecoder`]: Reads until the stream ends
//! - [`PayloadDecoder`]: Main decoder that coordinates different decoding strategies
//!
//! ## Encoders
//! - [`ChunkedEncoder`]: Implements chunked transfer encoding
//! - [`LengthEncoder`]: Handles fixed-length payload encoding
//! - [`IdentityEncoder`]: Passes bytes through
//! - [`PayloadEncoder`]: Main encoder that manages different encoding strategies

mod chunked_decoder;
mod chunked_encoder;
mod identity_decoder;
mod identity_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::{ChunkedEncoder, CHUNK_OVERHEAD};
pub use identity_decoder::IdentityDecoder;
pub use identity_encoder::IdentityEncoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
