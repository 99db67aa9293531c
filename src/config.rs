//! Bridge and server configuration.
//!
//! Both structs deserialize with serde, missing fields falling back to the
//! defaults below, so a host application can embed them in its own config
//! file.

use std::time::Duration;

use serde::Deserialize;

/// Default cap on a declared metadata block (16 MiB).
pub const DEFAULT_MAX_META_LENGTH: u64 = 16 * 1024 * 1024;

/// Default timeout for outbound TCP connects.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bind host (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default concurrent connection limit for a server.
pub const DEFAULT_MAX_CONNECTIONS: usize = 500;

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Largest metadata block accepted on receive.
    pub max_meta_length: u64,
    /// Timeout for [`connect`](crate::transport::connect), written as a
    /// human-readable duration such as `"10s"` or `"250ms"`.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Set `TCP_NODELAY` on TCP connections.
    pub nodelay: bool,
}

impl BridgeConfig {
    /// Set the metadata size limit.
    pub fn max_meta_length(mut self, limit: u64) -> Self {
        self.max_meta_length = limit;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_meta_length: DEFAULT_MAX_META_LENGTH,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
        }
    }
}

/// Listener settings for [`Server`](crate::server::Server).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind. Empty means all interfaces.
    pub host: String,
    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,
    /// Connections served at once; extra connections are closed on accept.
    pub max_connections: usize,
    /// Settings applied to every accepted connection.
    pub bridge: BridgeConfig,
}

impl ServerConfig {
    /// Config listening on all interfaces at `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Set the bind host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the concurrent connection limit.
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = limit;
        self
    }

    /// Set the per-connection settings.
    pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    /// `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() {
            DEFAULT_HOST
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 0,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bridge: BridgeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_connections, 500);
        assert_eq!(config.bridge.max_meta_length, 16 * 1024 * 1024);
        assert!(config.bridge.nodelay);
    }

    #[test]
    fn test_empty_host_binds_all_interfaces() {
        let config = ServerConfig::new(23000).host("");
        assert_eq!(config.bind_addr(), "0.0.0.0:23000");

        let config = ServerConfig::new(23000).host("127.0.0.1");
        assert_eq!(config.bind_addr(), "127.0.0.1:23000");
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"port": 22122, "bridge": {"nodelay": false}}"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.port, 22122);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(!config.bridge.nodelay);
        assert_eq!(config.bridge.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_deserialize_human_readable_timeout() {
        let json = r#"{"connect_timeout": "250ms"}"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(250));

        let json = r#"{"connect_timeout": "3s"}"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));

        assert!(serde_json::from_str::<BridgeConfig>(r#"{"connect_timeout": "soon"}"#).is_err());
    }

    #[test]
    fn test_chainable_setters() {
        let bridge = BridgeConfig::default()
            .max_meta_length(1024)
            .connect_timeout(Duration::from_millis(50))
            .nodelay(false);

        assert_eq!(bridge.max_meta_length, 1024);
        assert_eq!(bridge.connect_timeout, Duration::from_millis(50));
        assert!(!bridge.nodelay);
    }
}
