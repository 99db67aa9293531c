//! Streaming callback traits for message bodies.
//!
//! The bridge never buffers a body. On send it hands the live connection to a
//! [`BodyWriter`]; on receive it hands the envelope and the live connection to
//! a [`BodyHandler`]. Both get exclusive access for the duration of the call.
//!
//! # Body consumption contract
//!
//! A [`BodyHandler`] must read exactly `envelope.body_length()` bytes before
//! returning. The wire has no delimiters: leftover body bytes are parsed as
//! the next header and the connection desynchronizes. The bridge does not
//! check this.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::envelope::Envelope;
use crate::error::Result;
use crate::transport::Connection;

/// Boxed future for callback results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplies the body of an outbound message.
///
/// Invoked only when the envelope declares `body_length > 0`, right after the
/// header and metadata were written.
pub trait BodyWriter<S>: Send {
    /// Write the body to `out`.
    fn write_body<'a>(&'a mut self, out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>>;
}

/// Consumes the body of an inbound message.
pub trait BodyHandler<S>: Send {
    /// Value handed back to the caller of `receive_*`.
    type Output;

    /// Handle a message whose body starts at the current position of `input`.
    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<Self::Output>>;
}

impl<S, W: BodyWriter<S> + ?Sized> BodyWriter<S> for &mut W {
    fn write_body<'a>(&'a mut self, out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>> {
        (**self).write_body(out)
    }
}

impl<S, H: BodyHandler<S> + ?Sized> BodyHandler<S> for &mut H {
    type Output = H::Output;

    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<Self::Output>> {
        (**self).handle(envelope, input)
    }
}

/// Body writer backed by a closure. Created by [`body_fn`].
pub struct FnBody<F>(F);

/// Wrap a closure as a [`BodyWriter`].
///
/// ```
/// use tokio::io::{AsyncWriteExt, DuplexStream};
/// use tracker_bridge::handler::body_fn;
/// use tracker_bridge::transport::Connection;
/// use tracker_bridge::BridgeError;
///
/// let writer = body_fn(|out: &mut Connection<DuplexStream>| {
///     Box::pin(async move {
///         out.write_all(b"chunk").await?;
///         Ok::<_, BridgeError>(())
///     })
/// });
/// # drop(writer);
/// ```
pub fn body_fn<S, F>(f: F) -> FnBody<F>
where
    F: for<'a> FnMut(&'a mut Connection<S>) -> BoxFuture<'a, Result<()>> + Send,
{
    FnBody(f)
}

impl<S, F> BodyWriter<S> for FnBody<F>
where
    F: for<'a> FnMut(&'a mut Connection<S>) -> BoxFuture<'a, Result<()>> + Send,
{
    fn write_body<'a>(&'a mut self, out: &'a mut Connection<S>) -> BoxFuture<'a, Result<()>> {
        (self.0)(out)
    }
}

/// Body handler backed by a closure. Created by [`handler_fn`].
pub struct FnHandler<F, O> {
    f: F,
    _output: PhantomData<fn() -> O>,
}

/// Wrap a closure as a [`BodyHandler`].
pub fn handler_fn<S, O, F>(f: F) -> FnHandler<F, O>
where
    F: for<'a> FnMut(Envelope, &'a mut Connection<S>) -> BoxFuture<'a, Result<O>> + Send,
{
    FnHandler {
        f,
        _output: PhantomData,
    }
}

impl<S, O, F> BodyHandler<S> for FnHandler<F, O>
where
    F: for<'a> FnMut(Envelope, &'a mut Connection<S>) -> BoxFuture<'a, Result<O>> + Send,
{
    type Output = O;

    fn handle<'a>(
        &'a mut self,
        envelope: Envelope,
        input: &'a mut Connection<S>,
    ) -> BoxFuture<'a, Result<O>> {
        (self.f)(envelope, input)
    }
}
