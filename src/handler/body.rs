//! Ready-made body writers and handlers.
//!
//! Writers: [`NoBody`], [`BytesBody`], [`ReaderBody`].
//! Handlers: [`CollectBody`], [`CopyBody`], [`DiscardBody`].
//!
//! Streaming helpers move the body in chunks of at most
//! [`DEFAULT_BODY_CHUNK_SIZE`] bytes, so memory stays bounded regardless of
//! the announced body length.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::traits::{BodyHandler, BodyWriter, BoxFuture};
use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use crate::transport::Connection;

/// Default chunk size for streamed bodies (64 KiB).
pub const DEFAULT_BODY_CHUNK_SIZE: usize = 64 * 1024;

/// Default cap for [`CollectBody`] (16 MiB).
pub const DEFAULT_COLLECT_LIMIT: u64 = 16 * 1024 * 1024;

fn chunk_len(remaining: u64, chunk_size: usize) -> usize {
    remaining.min(chunk_size as u64) as usize
}

/// Writer for envelopes without a body. Never invoked by the bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBody;

impl<S> BodyWriter<S> for NoBody
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn write_body<'a>(&'a mut self, _out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Writes an in-memory body in one call.
#[derive(Debug, Clone)]
pub struct BytesBody(pub Bytes);

impl BytesBody {
    /// Length to announce in the envelope.
    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    /// True for a zero-length body.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S> BodyWriter<S> for BytesBody
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn write_body<'a>(&'a mut self, out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            out.write_all(&self.0).await?;
            Ok(())
        })
    }
}

/// Streams exactly `length` bytes from an async reader.
///
/// A source that ends early fails with `UnexpectedEof` rather than sending
/// fewer bytes than announced.
pub struct ReaderBody<R> {
    reader: R,
    remaining: u64,
    chunk_size: usize,
}

impl<R> ReaderBody<R> {
    /// Stream `length` bytes from `reader`.
    pub fn new(reader: R, length: u64) -> Self {
        Self {
            reader,
            remaining: length,
            chunk_size: DEFAULT_BODY_CHUNK_SIZE,
        }
    }

    /// Set the copy chunk size (minimum 1).
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Bytes not yet written.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<S, R> BodyWriter<S> for ReaderBody<R>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    fn write_body<'a>(&'a mut self, out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut buf = vec![0u8; chunk_len(self.remaining, self.chunk_size)];
            while self.remaining > 0 {
                let want = chunk_len(self.remaining, self.chunk_size);
                let n = self.reader.read(&mut buf[..want]).await?;
                if n == 0 {
                    return Err(BridgeError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("body source ended with {} bytes left", self.remaining),
                    )));
                }
                out.write_all(&buf[..n]).await?;
                self.remaining -= n as u64;
            }
            Ok(())
        })
    }
}

/// Reads the whole body into memory.
///
/// Bodies above the limit are refused before any body byte is read; the
/// connection is closed since the unread body cannot be skipped safely.
#[derive(Debug, Clone, Copy)]
pub struct CollectBody {
    limit: u64,
}

impl CollectBody {
    /// Collector with the default 16 MiB limit.
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_COLLECT_LIMIT,
        }
    }

    /// Collector refusing bodies above `limit` bytes.
    pub fn with_limit(limit: u64) -> Self {
        Self { limit }
    }
}

impl Default for CollectBody {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> BodyHandler<S> for CollectBody
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Output = (Envelope, Bytes);

    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<Self::Output>> {
        Box::pin(async move {
            let size = envelope.body_length();
            let len = match usize::try_from(size) {
                Ok(len) if size <= self.limit => len,
                _ => {
                    input.close().await;
                    return Err(BridgeError::BodyTooLarge {
                        size,
                        max: self.limit,
                    });
                }
            };
            if len == 0 {
                return Ok((envelope, Bytes::new()));
            }

            let mut body = BytesMut::zeroed(len);
            input.read_exact(&mut body).await?;
            Ok((envelope, body.freeze()))
        })
    }
}

/// Copies the body into an async writer chunk by chunk.
///
/// Output is the envelope and the number of bytes copied.
pub struct CopyBody<W> {
    writer: W,
    chunk_size: usize,
}

impl<W> CopyBody<W> {
    /// Copy bodies into `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            chunk_size: DEFAULT_BODY_CHUNK_SIZE,
        }
    }

    /// Set the copy chunk size (minimum 1).
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Reference to the destination writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Take back the destination writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<S, W> BodyHandler<S> for CopyBody<W>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    type Output = (Envelope, u64);

    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<Self::Output>> {
        Box::pin(async move {
            let total = envelope.body_length();
            let mut remaining = total;
            let mut buf = vec![0u8; chunk_len(remaining, self.chunk_size)];

            while remaining > 0 {
                let n = chunk_len(remaining, self.chunk_size);
                input.read_exact(&mut buf[..n]).await?;
                if let Err(e) = self.writer.write_all(&buf[..n]).await {
                    // the rest of the body is still on the wire
                    input.close().await;
                    return Err(e.into());
                }
                remaining -= n as u64;
            }

            if let Err(e) = self.writer.flush().await {
                input.close().await;
                return Err(e.into());
            }
            Ok((envelope, total))
        })
    }
}

/// Reads and drops the body, keeping the connection aligned.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardBody;

impl<S> BodyHandler<S> for DiscardBody
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Output = Envelope;

    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        Box::pin(async move {
            let mut remaining = envelope.body_length();
            let mut buf = vec![0u8; chunk_len(remaining, DEFAULT_BODY_CHUNK_SIZE)];
            while remaining > 0 {
                let n = chunk_len(remaining, DEFAULT_BODY_CHUNK_SIZE);
                input.read_exact(&mut buf[..n]).await?;
                remaining -= n as u64;
            }
            Ok(envelope)
        })
    }
}
