//! Channels: the transport boundary and the path-keyed registry.
//!
//! | Type | Role |
//! |------|------|
//! | [`Channel`] | duplex endpoint: `emit(event, payload, ack)`, `on(event, handler)` |
//! | [`ChannelFactory`] | opens a channel for a normalized path |
//! | [`ChannelRegistry`] | caches one channel per path |
//! | [`LocalChannel`] | in-process loopback implementation |

mod error;
mod local;
mod registry;
mod traits;

pub use error::ChannelError;
pub use local::{LocalChannel, LocalChannelFactory};
pub use registry::{normalize_path, ChannelRegistry};
pub use traits::{Channel, ChannelFactory, ChannelHandler, TransportAck};
