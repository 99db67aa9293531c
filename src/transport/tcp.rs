//! Outbound TCP connections.

use std::future::Future;
use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// Connect to `addr` and wrap the socket in a bridge.
///
/// # Errors
///
/// - `Timeout` if the connect does not finish within `config.connect_timeout`.
/// - `Io` if the connect fails or `TCP_NODELAY` cannot be set.
pub async fn connect<A>(addr: A, config: &BridgeConfig) -> Result<Bridge<TcpStream>>
where
    A: ToSocketAddrs + std::fmt::Debug,
{
    let label = format!("{:?}", addr);
    let stream = within(config.connect_timeout, &label, TcpStream::connect(addr)).await?;
    stream.set_nodelay(config.nodelay)?;

    tracing::debug!("connected to {}", label);
    Ok(Bridge::with_config(stream, config.clone()))
}

/// Run a dial future under `timeout`.
async fn within<F, T>(timeout: Duration, label: &str, dial: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, dial).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(BridgeError::Timeout(label.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_sets_nodelay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let bridge = connect(addr, &BridgeConfig::default()).await.unwrap();
        let (_accepted, _) = listener.accept().await.unwrap();

        assert!(!bridge.is_closed());
        assert_eq!(bridge.peer_addr(), Some(addr));
        assert!(bridge.connection().get_ref().unwrap().nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_dial_that_never_completes_times_out() {
        let dial = std::future::pending::<std::io::Result<TcpStream>>();

        let err = within(Duration::from_millis(20), "10.255.255.1:22122", dial)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(ref addr) if addr == "10.255.255.1:22122"));
        assert!(err.to_string().contains("timed out connecting"));
    }

    #[tokio::test]
    async fn test_dial_error_passes_through() {
        let dial = async {
            Err::<TcpStream, _>(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ))
        };

        let err = within(Duration::from_secs(1), "peer", dial).await.unwrap_err();
        assert!(matches!(err, BridgeError::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(addr, &BridgeConfig::default()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
