//! Pipelined connection to one cluster member
//!
//! Writes are buffered until [`Connection::flush`], so any number of
//! commands can be sent before the first reply is read.

use crate::common::{Error, Result};
use crate::protocol::{Command, Reply};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    /// Dial `addr`
    pub async fn open(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::ConnectionFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Queue a command without waiting for its reply
    pub async fn send(&mut self, cmd: &Command) -> Result<()> {
        let mut frame = BytesMut::new();
        cmd.encode(&mut frame);
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Queue a reply (server side)
    pub async fn send_reply(&mut self, reply: &Reply) -> Result<()> {
        let mut frame = BytesMut::new();
        reply.encode(&mut frame);
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Push every queued frame onto the socket
    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next reply in arrival order
    pub async fn receive(&mut self) -> Result<Reply> {
        match self.read_frame().await? {
            Some(reply) => Ok(reply),
            None => Err(Error::Protocol("connection closed by peer".into())),
        }
    }

    /// Read the next frame; `None` on a clean end of stream
    pub async fn read_frame(&mut self) -> Result<Option<Reply>> {
        // Parsing restarts at the front of the buffer after every read, so a
        // reply split across many segments costs time quadratic in its size.
        loop {
            if let Some((reply, used)) = Reply::parse(&self.buffer)? {
                self.buffer.advance(used);
                return Ok(Some(reply));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Protocol("connection reset mid-frame".into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reply_split_across_segments() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let expected = Reply::Array((0..50).map(|i| Reply::bulk(format!("v{}", i))).collect());
        let mut frame = BytesMut::new();
        expected.encode(&mut frame);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            for chunk in frame.chunks(3) {
                stream.write_all(chunk).await.unwrap();
                stream.flush().await.unwrap();
            }
        });

        let mut conn = Connection::open(&addr).await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), expected);
        server.await.unwrap();
        assert!(conn.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_reply_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(&b"*1\r\n".repeat(100)).await.unwrap();
            stream.flush().await.unwrap();
        });

        let mut conn = Connection::open(&addr).await.unwrap();
        let err = conn.receive().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {}", err);
    }
}
