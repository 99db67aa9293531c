//! Owned connection handle with fail-fast reads and idempotent close.
//!
//! A [`Connection`] wraps one bidirectional byte stream. Once any read on it
//! fails the stream is shut down and dropped: a partially consumed frame
//! cannot be realigned, so the only safe recovery is a new connection.
//!
//! # Example
//!
//! ```
//! use tracker_bridge::transport::Connection;
//! use tokio::io::AsyncWriteExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tracker_bridge::Result<()> {
//! let (a, b) = tokio::io::duplex(64);
//! let mut writer = Connection::new(a);
//! let mut reader = Connection::new(b);
//!
//! writer.write_all(b"hello").await?;
//! let mut buf = [0u8; 5];
//! reader.read_exact(&mut buf).await?;
//! assert_eq!(&buf, b"hello");
//!
//! writer.close().await;
//! writer.close().await; // no-op
//! assert!(writer.is_closed());
//! # Ok(())
//! # }
//! ```

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::error::{BridgeError, Result};

/// A connection handle owning a byte stream until it is closed.
///
/// `Connection::default()` is an empty handle: it reports closed and closing
/// it does nothing.
#[derive(Debug)]
pub struct Connection<S> {
    stream: Option<S>,
}

impl<S> Default for Connection<S> {
    fn default() -> Self {
        Self { stream: None }
    }
}

impl<S> Connection<S> {
    /// Wrap an open stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Check whether the connection has been closed (or was never open).
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Get a reference to the underlying stream, if still open.
    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Get a mutable reference to the underlying stream, if still open.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Take the underlying stream out of the handle.
    pub fn into_inner(self) -> Option<S> {
        self.stream
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Shut down and drop the stream.
    ///
    /// Calling this on a closed or empty handle does nothing. Shutdown errors
    /// are ignored: the stream is dropped either way.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("shutdown on close failed: {}", e);
            }
        }
    }

    /// Read exactly `buf.len()` bytes.
    ///
    /// Every iteration either makes progress or fails. A zero-byte read
    /// (end of stream) or an I/O error before the buffer is full closes the
    /// connection and returns `ReadFailure` with the count read so far.
    ///
    /// # Errors
    ///
    /// - `ConnectionClosed` if the handle is already closed.
    /// - `ReadFailure` on a short read; the connection is closed.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let expected = buf.len();
        let mut filled = 0;

        while filled < expected {
            let stream = self.stream.as_mut().ok_or(BridgeError::ConnectionClosed)?;
            match stream.read(&mut buf[filled..]).await {
                Ok(0) => {
                    self.close().await;
                    return Err(BridgeError::ReadFailure {
                        expected,
                        read: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) => {
                    tracing::debug!("read failed after {}/{} bytes: {}", filled, expected, e);
                    self.close().await;
                    return Err(BridgeError::ReadFailure {
                        expected,
                        read: filled,
                    });
                }
            }
        }

        Ok(())
    }
}

impl Connection<tokio::net::TcpStream> {
    /// Remote address of a TCP connection.
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}

impl<S: AsyncRead + Unpin> AsyncRead for Connection<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            None => Poll::Ready(Err(closed_error())),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Connection<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_write(cx, buf),
            None => Poll::Ready(Err(closed_error())),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            None => Poll::Ready(Err(closed_error())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// Stream that returns its data in small pieces.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        reads: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let end = (self.pos + self.step)
                .min(self.data.len())
                .min(self.pos + buf.remaining());
            let pos = self.pos;
            buf.put_slice(&self.data[pos..end]);
            self.pos = end;
            self.reads += 1;
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for Trickle {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_exact_accumulates_partial_reads() {
        let mut conn = Connection::new(Trickle {
            data: (0u8..18).collect(),
            pos: 0,
            step: 4,
            reads: 0,
        });

        let mut buf = [0u8; 18];
        conn.read_exact(&mut buf).await.unwrap();

        assert_eq!(buf.to_vec(), (0u8..18).collect::<Vec<_>>());
        assert_eq!(conn.get_ref().unwrap().reads, 5);
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_read_exact_eof_closes() {
        let mut conn = Connection::new(Trickle {
            data: vec![1, 2, 3],
            pos: 0,
            step: 2,
            reads: 0,
        });

        let mut buf = [0u8; 10];
        let err = conn.read_exact(&mut buf).await.unwrap_err();

        assert!(matches!(
            err,
            BridgeError::ReadFailure {
                expected: 10,
                read: 3
            }
        ));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_read_after_close_fails() {
        let (a, _b) = duplex(64);
        let mut conn = Connection::new(a);
        conn.close().await;

        let mut buf = [0u8; 1];
        let result = conn.read_exact(&mut buf).await;
        assert!(matches!(result, Err(BridgeError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_exact_empty_buffer_is_noop() {
        let (a, _b) = duplex(64);
        let mut conn = Connection::new(a);

        conn.read_exact(&mut []).await.unwrap();
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (a, _b) = duplex(64);
        let mut conn = Connection::new(a);

        conn.close().await;
        assert!(conn.is_closed());
        conn.close().await;
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_close_empty_handle() {
        let mut conn: Connection<tokio::io::DuplexStream> = Connection::default();

        assert!(conn.is_closed());
        conn.close().await;
        assert!(conn.is_closed());
        assert!(conn.into_inner().is_none());
    }

    #[tokio::test]
    async fn test_close_signals_eof_to_peer() {
        let (a, b) = duplex(64);
        let mut local = Connection::new(a);
        let mut peer = Connection::new(b);

        local.close().await;

        let mut buf = [0u8; 1];
        let err = peer.read_exact(&mut buf).await.unwrap_err();
        assert!(matches!(err, BridgeError::ReadFailure { read: 0, .. }));
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_write_on_closed_connection() {
        let mut conn: Connection<tokio::io::DuplexStream> = Connection::default();

        let err = conn.write_all(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
