//! Bridge - request/response exchange over one connection.
//!
//! A [`Bridge`] owns a [`Connection`] and moves whole messages across it:
//! header and metadata are written as one contiguous buffer, the body is
//! streamed through a [`BodyWriter`] on send and a [`BodyHandler`] on
//! receive. Messages are strictly sequential; there is no pipelining.
//!
//! ```text
//! Idle ──► AwaitHeader ──► AwaitMeta ──► DispatchBody ──► Idle
//!   └──────────┴───────────────┴──────────────┴──────► Closed
//! ```
//!
//! Any read or write failure closes the connection, and a closed bridge
//! stays closed.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::BridgeConfig;
use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};
use crate::handler::{BodyHandler, BodyWriter};
use crate::protocol::{build_frame_head, read_header, read_meta, OperationRegistry};
use crate::transport::Connection;

/// Where a bridge is in the message cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Between messages.
    Idle,
    /// Reading the fixed header.
    AwaitHeader,
    /// Reading the metadata block.
    AwaitMeta,
    /// Body handler is running.
    DispatchBody,
    /// Connection closed; terminal.
    Closed,
}

/// One side of a tracker/storage connection.
#[derive(Debug)]
pub struct Bridge<S> {
    connection: Connection<S>,
    registry: Arc<OperationRegistry>,
    config: BridgeConfig,
    state: BridgeState,
}

impl<S> Bridge<S> {
    /// Bridge with default config over the shared registry.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, BridgeConfig::default())
    }

    /// Bridge with explicit settings over the shared registry.
    pub fn with_config(stream: S, config: BridgeConfig) -> Self {
        Self {
            connection: Connection::new(stream),
            registry: OperationRegistry::shared(),
            config,
            state: BridgeState::Idle,
        }
    }

    /// Use a custom operation registry.
    pub fn with_registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Current position in the message cycle.
    #[inline]
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Check whether the connection has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// The underlying connection handle.
    pub fn connection(&self) -> &Connection<S> {
        &self.connection
    }

    /// Registry used to encode and decode tags.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Settings this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Take the underlying stream; `None` if the bridge was closed.
    pub fn into_inner(self) -> Option<S> {
        self.connection.into_inner()
    }

    fn settle(&mut self) {
        self.state = if self.connection.is_closed() {
            BridgeState::Closed
        } else {
            BridgeState::Idle
        };
    }
}

impl Bridge<tokio::net::TcpStream> {
    /// Remote address, while the connection is open.
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.connection.peer_addr()
    }
}

impl<S> Bridge<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Close the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        self.connection.close().await;
        self.state = BridgeState::Closed;
    }

    /// Send a request message.
    ///
    /// `body` is invoked only when `envelope.body_length() > 0` and must write
    /// exactly that many bytes.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` before anything is written; the connection
    ///   stays open.
    /// - `ShortHeaderWrite` or `Io` if the header and metadata could not be
    ///   written.
    /// - `ShortBodyWrite` wrapping the body writer's error.
    /// - `ConnectionClosed` if the bridge was already closed.
    ///
    /// Every error except `UnsupportedOperation` leaves the bridge closed.
    pub async fn send_request<W: BodyWriter<S>>(&mut self, envelope: &Envelope, body: W) -> Result<()> {
        self.send(envelope, body, "request").await
    }

    /// Send a response message. Same wire format and errors as
    /// [`send_request`](Self::send_request), metadata included.
    pub async fn send_response<W: BodyWriter<S>>(&mut self, envelope: &Envelope, body: W) -> Result<()> {
        self.send(envelope, body, "response").await
    }

    /// Receive a request and hand its body to `handler`.
    ///
    /// The handler must consume exactly `envelope.body_length()` bytes. Its
    /// result is returned as is; a handler error does not close the
    /// connection unless the handler closed it.
    ///
    /// A tag missing from the registry is delivered as
    /// [`Operation::UNKNOWN`](crate::protocol::Operation::UNKNOWN).
    ///
    /// # Errors
    ///
    /// - `ReadFailure` on a short header or metadata read.
    /// - `MetaTooLarge` if the declared metadata exceeds the configured limit.
    /// - `ConnectionClosed` if the bridge was already closed.
    pub async fn receive_request<H: BodyHandler<S>>(&mut self, handler: H) -> Result<H::Output> {
        self.receive(handler, "request").await
    }

    /// Receive a response and hand its body to `handler`.
    pub async fn receive_response<H: BodyHandler<S>>(&mut self, handler: H) -> Result<H::Output> {
        self.receive(handler, "response").await
    }

    /// Send a request and wait for its response.
    pub async fn call<W, H>(&mut self, request: &Envelope, body: W, handler: H) -> Result<H::Output>
    where
        W: BodyWriter<S>,
        H: BodyHandler<S>,
    {
        self.send_request(request, body).await?;
        self.receive_response(handler).await
    }

    async fn send<W: BodyWriter<S>>(
        &mut self,
        envelope: &Envelope,
        mut body: W,
        kind: &'static str,
    ) -> Result<()> {
        if self.connection.is_closed() {
            self.state = BridgeState::Closed;
            return Err(BridgeError::ConnectionClosed);
        }

        let header = envelope.header();
        let head = build_frame_head(&header, envelope.meta_body(), &self.registry)?;
        self.write_head(&head).await?;

        if envelope.has_body() {
            if let Err(e) = body.write_body(&mut self.connection).await {
                self.close().await;
                return Err(BridgeError::ShortBodyWrite(Box::new(e)));
            }
        }

        if let Err(e) = self.connection.flush().await {
            self.close().await;
            return Err(e.into());
        }

        tracing::debug!(
            "sent {} {}: meta {} bytes, body {} bytes",
            kind,
            header.operation,
            header.meta_length,
            header.body_length
        );
        Ok(())
    }

    async fn write_head(&mut self, head: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < head.len() {
            match self.connection.write(&head[written..]).await {
                Ok(0) => {
                    self.close().await;
                    return Err(BridgeError::ShortHeaderWrite {
                        written,
                        expected: head.len(),
                    });
                }
                Ok(n) => written += n,
                Err(e) => {
                    self.close().await;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    async fn receive<H: BodyHandler<S>>(
        &mut self,
        mut handler: H,
        kind: &'static str,
    ) -> Result<H::Output> {
        let envelope = match self.read_envelope(kind).await {
            Ok(envelope) => envelope,
            Err(e) => {
                self.settle();
                return Err(e);
            }
        };

        self.state = BridgeState::DispatchBody;
        let result = handler.handle(envelope, &mut self.connection).await;
        self.settle();
        result
    }

    async fn read_envelope(&mut self, kind: &'static str) -> Result<Envelope> {
        if self.connection.is_closed() {
            return Err(BridgeError::ConnectionClosed);
        }

        self.state = BridgeState::AwaitHeader;
        let header = read_header(&mut self.connection, &self.registry).await?;
        if header.operation.is_unknown() {
            tracing::warn!("received {} with unknown operation tag {:?}", kind, header.tag);
        }

        self.state = BridgeState::AwaitMeta;
        let meta = read_meta(&mut self.connection, &header, self.config.max_meta_length).await?;

        tracing::debug!(
            "received {} {}: meta {} bytes, body {} bytes",
            kind,
            header.operation,
            header.meta_length,
            header.body_length
        );
        Ok(Envelope::from_frame(&header, meta))
    }
}
