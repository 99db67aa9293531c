//! Accept loop serving one bridge per TCP connection.
//!
//! Each accepted socket gets its own task and its own [`Bridge`], so a slow
//! peer never blocks the others. The number of live connections is capped
//! by a semaphore; a connection arriving at the cap is closed right away.
//!
//! # Example
//!
//! ```no_run
//! use tokio::net::TcpStream;
//! use tracker_bridge::handler::{CollectBody, NoBody};
//! use tracker_bridge::{Bridge, Envelope, Operation, Server, ServerConfig};
//!
//! async fn answer(mut bridge: Bridge<TcpStream>) -> tracker_bridge::Result<()> {
//!     loop {
//!         let (request, _body) = bridge.receive_request(CollectBody::new()).await?;
//!         let response = Envelope::build(Operation::RESPONSE, &request.operation().code(), 0)?;
//!         bridge.send_response(&response, NoBody).await?;
//!     }
//! }
//!
//! # async fn run() -> tracker_bridge::Result<()> {
//! let server = Server::bind(&ServerConfig::new(22122)).await?;
//! server.serve(answer).await
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::bridge::Bridge;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::handler::BoxFuture;
use crate::protocol::OperationRegistry;

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serves one accepted connection.
///
/// Returning `Err` ends the connection; a peer hang-up between messages is
/// logged at debug level, anything else at error level.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Drive one connection until it ends.
    fn handle(&self, bridge: Bridge<TcpStream>) -> BoxFuture<'static, Result<()>>;
}

impl<F, Fut> ConnectionHandler for F
where
    F: Fn(Bridge<TcpStream>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn handle(&self, bridge: Bridge<TcpStream>) -> BoxFuture<'static, Result<()>> {
        Box::pin(self(bridge))
    }
}

/// TCP listener handing connections to a [`ConnectionHandler`].
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<OperationRegistry>,
    semaphore: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        tracing::debug!("listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            config: config.clone(),
            registry: OperationRegistry::shared(),
            semaphore: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Registry given to every accepted bridge.
    pub fn with_registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Settings the server was bound with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections forever.
    pub async fn serve<H: ConnectionHandler>(self, handler: H) -> Result<()> {
        self.serve_until(handler, std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already being served keep running after this returns.
    pub async fn serve_until<H, F>(self, handler: H, shutdown: F) -> Result<()>
    where
        H: ConnectionHandler,
        F: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("stopped accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer, &handler),
                    Err(e) => {
                        tracing::warn!("accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }

    fn dispatch<H: ConnectionHandler>(&self, stream: TcpStream, peer: SocketAddr, handler: &Arc<H>) {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(
                    "connection limit {} reached, closing {}",
                    self.config.max_connections,
                    peer
                );
                return;
            }
        };

        if let Err(e) = stream.set_nodelay(self.config.bridge.nodelay) {
            tracing::debug!("set_nodelay failed for {}: {}", peer, e);
        }

        let bridge = Bridge::with_config(stream, self.config.bridge.clone())
            .with_registry(Arc::clone(&self.registry));
        let handler = Arc::clone(handler);

        tokio::spawn(async move {
            let _permit = permit;
            match handler.handle(bridge).await {
                Ok(()) => tracing::debug!("connection {} finished", peer),
                Err(e) if e.is_disconnect() => tracing::debug!("peer {} disconnected", peer),
                Err(e) => tracing::error!("connection {} failed: {}", peer, e),
            }
        });
    }
}
