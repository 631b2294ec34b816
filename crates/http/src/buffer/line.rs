use bytes::{Bytes, BytesMut};

use crate::ensure;
use crate::protocol::ParseError;

/// Splits one line off the front of `src`.
///
/// Lines end with LF, an optional CR before it is stripped as well. The
/// returned line never contains the terminator.
///
/// When no terminator has been seen yet the line is incomplete and `None` is
/// returned, unless `eof` is set: then whatever is left forms the last line.
///
/// # Errors
///
/// Returns [`ParseError::LineTooLong`] as soon as the line is known to be
/// longer than `max_line_length`, complete or not. A limit of `0` disables
/// the check.
pub fn read_line(src: &mut BytesMut, max_line_length: usize, eof: bool) -> Result<Option<Bytes>, ParseError> {
    match src.iter().position(|b| *b == b'\n') {
        Some(lf) => {
            let mut line = src.split_to(lf + 1);
            line.truncate(lf);
            if line.last() == Some(&b'\r') {
                line.truncate(lf - 1);
            }
            ensure!(max_line_length == 0 || line.len() <= max_line_length, ParseError::line_too_long(max_line_length));
            Ok(Some(line.freeze()))
        }

        None => {
            // a trailing CR may still turn out to be part of the terminator
            let pending = match src.last() {
                Some(b'\r') => src.len() - 1,
                _ => src.len(),
            };
            ensure!(max_line_length == 0 || pending <= max_line_length, ParseError::line_too_long(max_line_length));

            if eof && !src.is_empty() {
                let mut line = src.split();
                line.truncate(pending);
                return Ok(Some(line.freeze()));
            }

            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_and_lf_lines() {
        let mut src = BytesMut::from(&b"first\r\nsecond\nthird"[..]);

        assert_eq!(read_line(&mut src, 0, false).unwrap().unwrap(), &b"first"[..]);
        assert_eq!(read_line(&mut src, 0, false).unwrap().unwrap(), &b"second"[..]);
        assert!(read_line(&mut src, 0, false).unwrap().is_none());
        assert_eq!(&src[..], b"third");

        assert_eq!(read_line(&mut src, 0, true).unwrap().unwrap(), &b"third"[..]);
        assert!(src.is_empty());
        assert!(read_line(&mut src, 0, true).unwrap().is_none());
    }

    #[test]
    fn empty_line() {
        let mut src = BytesMut::from(&b"\r\nrest"[..]);
        assert_eq!(read_line(&mut src, 0, false).unwrap().unwrap(), &b""[..]);
        assert_eq!(&src[..], b"rest");
    }

    #[test]
    fn line_split_before_lf() {
        let mut src = BytesMut::from(&b"12345\r"[..]);
        assert!(read_line(&mut src, 5, false).unwrap().is_none());

        src.extend_from_slice(b"\n");
        assert_eq!(read_line(&mut src, 5, false).unwrap().unwrap(), &b"12345"[..]);
    }

    #[test]
    fn too_long_line() {
        let mut src = BytesMut::from(&b"123456\r\n"[..]);
        assert!(matches!(read_line(&mut src, 5, false), Err(ParseError::LineTooLong { max_len: 5 })));

        // detected before the terminator arrives
        let mut src = BytesMut::from(&b"123456"[..]);
        assert!(matches!(read_line(&mut src, 5, false), Err(ParseError::LineTooLong { max_len: 5 })));
    }
}
