//! Handler module - streaming body callbacks.
//!
//! Provides:
//! - [`BodyWriter`] - supplies an outbound body after the frame head
//! - [`BodyHandler`] - consumes an inbound body and produces a result
//! - Ready-made implementations for common cases
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use tracker_bridge::handler::{BytesBody, CollectBody};
//! use tracker_bridge::{Bridge, Envelope, Operation};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tracker_bridge::Result<()> {
//! let (a, b) = tokio::io::duplex(1024);
//! let mut client = Bridge::new(a);
//! let mut server = Bridge::new(b);
//!
//! let body = BytesBody(Bytes::from_static(b"chunk"));
//! let request = Envelope::build(Operation::CONNECT, &"node-1", body.len())?;
//! client.send_request(&request, body).await?;
//!
//! let (envelope, body) = server.receive_request(CollectBody::new()).await?;
//! assert_eq!(envelope.operation(), Operation::CONNECT);
//! assert_eq!(&body[..], b"chunk");
//! # Ok(())
//! # }
//! ```

mod body;
mod traits;

pub use body::{
    BytesBody, CollectBody, CopyBody, DiscardBody, NoBody, ReaderBody, DEFAULT_BODY_CHUNK_SIZE,
    DEFAULT_COLLECT_LIMIT,
};
pub use traits::{body_fn, handler_fn, BodyHandler, BodyWriter, BoxFuture, FnBody, FnHandler};
