//! Commands sent to cluster members

use crate::common::lossy_text;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// A command invocation: name plus positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl ToArg) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Append several arguments
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToArg,
    {
        self.args.extend(args.into_iter().map(|a| a.to_arg()));
        self
    }

    /// Build a command from whitespace-free parts, the first one being the name
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Option<Self> {
        let (name, rest) = parts.split_first()?;
        Some(Self::new(name.as_ref()).args(rest.iter().map(|s| s.as_ref())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Bytes] {
        &self.args
    }

    /// Append the request encoding (array of bulk strings) to `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(b'*');
        dst.put_slice((self.args.len() + 1).to_string().as_bytes());
        dst.put_slice(b"\r\n");
        put_bulk(dst, self.name.as_bytes());
        for arg in &self.args {
            put_bulk(dst, arg);
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", lossy_text(arg))?;
        }
        Ok(())
    }
}

fn put_bulk(dst: &mut BytesMut, payload: &[u8]) {
    dst.put_u8(b'$');
    dst.put_slice(payload.len().to_string().as_bytes());
    dst.put_slice(b"\r\n");
    dst.put_slice(payload);
    dst.put_slice(b"\r\n");
}

/// Conversion of a Rust value into a command argument
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for &str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for &[u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

macro_rules! display_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

display_arg!(i32, i64, u16, u32, u64, usize, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set() {
        let cmd = Command::new("SET").arg("please").arg("allow");
        let mut buf = BytesMut::new();
        cmd.encode(&mut buf);
        assert_eq!(
            &buf[..],
            b"*3\r\n$3\r\nSET\r\n$6\r\nplease\r\n$5\r\nallow\r\n"
        );
    }

    #[test]
    fn test_numeric_args() {
        let cmd = Command::new("INCRBYFLOAT").arg("f").arg(2.5f64);
        assert_eq!(cmd.arguments()[1], Bytes::from("2.5"));
        let cmd = Command::new("EXPIRE").arg("k").arg(10i64);
        assert_eq!(cmd.to_string(), "EXPIRE k 10");
    }

    #[test]
    fn test_from_parts() {
        let cmd = Command::from_parts(&["MGET", "a", "b"]).unwrap();
        assert_eq!(cmd.name(), "MGET");
        assert_eq!(cmd.arguments().len(), 2);
        assert!(Command::from_parts::<&str>(&[]).is_none());
    }
}
