//! HTTP codec module for encoding and decoding HTTP messages
//!
//! All codecs work on the session buffers through
//! [`Decoder`](tokio_util::codec::Decoder) and
//! [`Encoder`](tokio_util::codec::Encoder), and can be resumed at any byte
//! boundary.
//!
//! - [`head`]: message heads, with [`MessageParser`](head::MessageParser) and
//!   [`MessageWriter`](head::MessageWriter)
//! - [`body`]: the transfer-coding decoders and encoders for message bodies
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use nio_http::codec::body::PayloadDecoder;
//! use nio_http::codec::head::RequestParser;
//! use nio_http::protocol::framing;
//! use tokio_util::codec::Decoder;
//!
//! let mut src = BytesMut::from(&b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..]);
//!
//! let head = RequestParser::default().decode(&mut src).unwrap().unwrap();
//! let coding = framing::body_coding(head.headers(), false).unwrap().unwrap();
//!
//! let mut body = PayloadDecoder::new(coding, Default::default());
//! let chunk = body.decode(&mut src).unwrap().unwrap();
//! assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"hello");
//! assert!(body.decode(&mut src).unwrap().unwrap().is_eof());
//! ```

pub mod body;
pub mod head;
