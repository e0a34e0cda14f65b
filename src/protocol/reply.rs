//! Reply values and their RESP framing
//!
//! Frame format (one type byte, CRLF-terminated header):
//! `+status`, `-error`, `:integer`, `$len` + payload, `*count` + elements.
//! `$-1` and `*-1` both decode to a nil bulk.

use crate::common::{lossy_text, Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Deepest array nesting accepted from a peer
const MAX_DEPTH: usize = 32;

/// Largest bulk payload accepted from a peer (same as Redis' default)
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// A reply received from (or sent by) a cluster member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Reply::Error(text.into())
    }

    pub fn bulk(payload: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(payload.into()))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Bulk(None))
    }

    /// Error text, when this reply is an error
    pub fn as_error(&self) -> Option<&str> {
        match self {
            Reply::Error(text) => Some(text),
            _ => None,
        }
    }

    /// Decode one reply from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a complete frame,
    /// otherwise the reply and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(Reply, usize)>> {
        parse_at(buf, 0, 0)
    }

    /// Append the RESP encoding of this reply to `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Status(text) => put_line(dst, b'+', text.as_bytes()),
            Reply::Error(text) => put_line(dst, b'-', text.as_bytes()),
            Reply::Integer(n) => put_line(dst, b':', n.to_string().as_bytes()),
            Reply::Bulk(None) => dst.put_slice(b"$-1\r\n"),
            Reply::Bulk(Some(payload)) => {
                put_line(dst, b'$', payload.len().to_string().as_bytes());
                dst.put_slice(payload);
                dst.put_slice(b"\r\n");
            }
            Reply::Array(items) => {
                put_line(dst, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(text) | Reply::Error(text) => write!(f, "{}", text),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Bulk(None) => write!(f, "<nil>"),
            Reply::Bulk(Some(payload)) => write!(f, "{}", lossy_text(payload)),
            Reply::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn put_line(dst: &mut BytesMut, kind: u8, body: &[u8]) {
    dst.put_u8(kind);
    dst.put_slice(body);
    dst.put_slice(b"\r\n");
}

/// Find the CRLF-terminated line starting at `start`.
/// Returns the line body and the offset just past the CRLF.
fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(start..)?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..end], start + end + 2))
}

fn parse_int(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("invalid integer: {:?}", lossy_text(line))))
}

fn parse_at(buf: &[u8], pos: usize, depth: usize) -> Result<Option<(Reply, usize)>> {
    if depth > MAX_DEPTH {
        return Err(Error::Protocol(format!(
            "arrays nested deeper than {}",
            MAX_DEPTH
        )));
    }
    let Some(&kind) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(buf, pos + 1) else {
        return Ok(None);
    };

    match kind {
        b'+' => Ok(Some((Reply::Status(lossy_text(line)), next))),
        b'-' => Ok(Some((Reply::Error(lossy_text(line)), next))),
        b':' => Ok(Some((Reply::Integer(parse_int(line)?), next))),
        b'$' => {
            let len = parse_int(line)?;
            if len < 0 {
                return Ok(Some((Reply::Bulk(None), next)));
            }
            if len > MAX_BULK_LEN {
                return Err(Error::Protocol(format!("bulk length {} too large", len)));
            }
            let end = next + len as usize;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(Error::Protocol("bulk payload not CRLF-terminated".into()));
            }
            let payload = Bytes::copy_from_slice(&buf[next..end]);
            Ok(Some((Reply::Bulk(Some(payload)), end + 2)))
        }
        b'*' => {
            let count = parse_int(line)?;
            if count < 0 {
                return Ok(Some((Reply::Bulk(None), next)));
            }
            // Every element takes at least 3 bytes; never trust the count alone
            let mut items = Vec::with_capacity((count as usize).min((buf.len() - next) / 3));
            let mut cursor = next;
            for _ in 0..count {
                match parse_at(buf, cursor, depth + 1)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(items), cursor)))
        }
        other => Err(Error::Protocol(format!(
            "unexpected frame type byte: 0x{:02x}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Reply {
        let (reply, used) = Reply::parse(input).unwrap().unwrap();
        assert_eq!(used, input.len());
        reply
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_all(b"+OK\r\n"), Reply::ok());
        assert_eq!(
            parse_all(b"-TRY 20001\r\n"),
            Reply::Error("TRY 20001".into())
        );
        assert_eq!(parse_all(b":-42\r\n"), Reply::Integer(-42));
        assert_eq!(parse_all(b"$5\r\nallow\r\n"), Reply::bulk("allow"));
        assert_eq!(parse_all(b"$0\r\n\r\n"), Reply::bulk(""));
        assert_eq!(parse_all(b"$-1\r\n"), Reply::nil());
        assert_eq!(parse_all(b"*-1\r\n"), Reply::nil());
    }

    #[test]
    fn test_parse_nested_array() {
        let reply = parse_all(b"*3\r\n$-1\r\n$1\r\na\r\n*2\r\n$-1\r\n$1\r\nb\r\n");
        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::nil(),
                Reply::bulk("a"),
                Reply::Array(vec![Reply::nil(), Reply::bulk("b")]),
            ])
        );
    }

    #[test]
    fn test_parse_incomplete() {
        assert!(Reply::parse(b"").unwrap().is_none());
        assert!(Reply::parse(b"+OK").unwrap().is_none());
        assert!(Reply::parse(b"$5\r\nall").unwrap().is_none());
        assert!(Reply::parse(b"*2\r\n:1\r\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_leaves_trailing_bytes() {
        let (reply, used) = Reply::parse(b":1\r\n+OK\r\n").unwrap().unwrap();
        assert_eq!(reply, Reply::Integer(1));
        assert_eq!(used, 4);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(Reply::parse(b"?what\r\n").is_err());
        assert!(Reply::parse(b":abc\r\n").is_err());
        assert!(Reply::parse(b"$3\r\nabcd\r\n").is_err());
    }

    #[test]
    fn test_parse_huge_array_header() {
        assert!(Reply::parse(b"*9223372036854775807\r\n").unwrap().is_none());
        assert!(Reply::parse(b"*100000000000\r\n:1\r\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_huge_bulk_header() {
        let err = Reply::parse(b"$9223372036854775807\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let input = b"*1\r\n".repeat(10_000);
        let err = Reply::parse(&input).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {}", err);

        // Reasonable nesting still parses
        let mut ok = b"*1\r\n".repeat(MAX_DEPTH);
        ok.extend_from_slice(b":7\r\n");
        assert!(Reply::parse(&ok).unwrap().is_some());
    }

    #[test]
    fn test_encode_nested_array() {
        let reply = Reply::Array(vec![
            Reply::Integer(1),
            Reply::nil(),
            Reply::Array(vec![Reply::ok()]),
        ]);
        let mut buf = BytesMut::new();
        reply.encode(&mut buf);
        assert_eq!(&buf[..], b"*3\r\n:1\r\n$-1\r\n*1\r\n+OK\r\n");
        assert_eq!(parse_all(&buf), reply);
    }

    #[test]
    fn test_display() {
        let reply = Reply::Array(vec![Reply::bulk("a"), Reply::Integer(2), Reply::nil()]);
        assert_eq!(reply.to_string(), "[a 2 <nil>]");
        assert_eq!(Reply::Error("ERR x".into()).to_string(), "ERR x");
    }
}
