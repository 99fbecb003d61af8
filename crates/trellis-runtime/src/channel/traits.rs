//! Transport boundary.
//!
//! A [`Channel`] is a named duplex endpoint with `emit(event, payload,
//! ack)` and `on(event, handler)`. Framing and delivery belong to the
//! implementation; Trellis only relies on the ack being called at most
//! once with the receiver's reply.

use super::ChannelError;
use serde_json::Value;
use std::sync::Arc;

/// Reply callback carried with an emission.
///
/// Receives `None` (or `Some(Value::Null)`) on success, or an error payload.
pub type TransportAck = Box<dyn FnOnce(Option<Value>) + Send>;

/// Receiver side of an event.
pub type ChannelHandler = Arc<dyn Fn(Value, Option<TransportAck>) + Send + Sync>;

/// A path-keyed duplex channel.
pub trait Channel: Send + Sync {
    /// Canonical path this channel was opened for.
    fn path(&self) -> &str;

    /// Sends `payload` as `event`, optionally expecting a reply on `ack`.
    ///
    /// # Errors
    ///
    /// Implementation-specific; see [`ChannelError`].
    fn emit(&self, event: &str, payload: Value, ack: Option<TransportAck>)
        -> Result<(), ChannelError>;

    /// Registers `handler` for incoming `event`s.
    fn on(&self, event: &str, handler: ChannelHandler);
}

/// Opens channels for the [`ChannelRegistry`](super::ChannelRegistry).
pub trait ChannelFactory: Send + Sync {
    /// Opens the channel for an already-normalized `path`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Factory`] when the transport refuses.
    fn open(&self, path: &str) -> Result<Arc<dyn Channel>, ChannelError>;
}
