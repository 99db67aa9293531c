//! Transport module - connection handles and TCP dialing.
//!
//! Provides:
//! - [`Connection`] - owned stream with fail-fast reads and idempotent close
//! - [`connect`] - dial a peer and wrap the socket in a [`Bridge`](crate::Bridge)

mod connection;
mod tcp;

pub use connection::Connection;
pub use tcp::connect;
