//! # tracker-bridge
//!
//! Binary RPC transport between tracker and storage nodes.
//!
//! Every message is an 18-byte header, a metadata block and an optional
//! body. The header carries a 2-byte operation tag and the big-endian
//! lengths of the two segments that follow:
//!
//! ```text
//! ┌──────────┬─────────────┬─────────────┬──────────────┬──────────────┐
//! │ Op tag   │ Meta length │ Body length │ Metadata     │ Body         │
//! │ 2 bytes  │ u64 BE      │ u64 BE      │ meta length  │ body length  │
//! └──────────┴─────────────┴─────────────┴──────────────┴──────────────┘
//! ```
//!
//! Metadata is small and buffered. Bodies can be arbitrarily large and are
//! streamed through [`BodyWriter`](handler::BodyWriter) and
//! [`BodyHandler`](handler::BodyHandler) callbacks, never held in memory by
//! the bridge.
//!
//! ## Example
//!
//! ```no_run
//! use tracker_bridge::handler::{CollectBody, NoBody};
//! use tracker_bridge::{connect, BridgeConfig, Envelope, Operation};
//!
//! # async fn run() -> tracker_bridge::Result<()> {
//! let mut bridge = connect("127.0.0.1:22122", &BridgeConfig::default()).await?;
//!
//! let request = Envelope::build(Operation::CONNECT, &"storage-1", 0)?;
//! let (response, body) = bridge.call(&request, NoBody, CollectBody::new()).await?;
//! println!("{} with {} body bytes", response.operation(), body.len());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod transport;

pub use bridge::{Bridge, BridgeState};
pub use config::{BridgeConfig, ServerConfig};
pub use envelope::{Envelope, EnvelopeBuilder};
pub use error::{BridgeError, Result};
pub use protocol::{Operation, OperationRegistry};
pub use server::{ConnectionHandler, Server};
pub use transport::connect;
