//! Event primitives for Trellis.
//!
//! Every component owns one [`EventBus`]. Topics are plain strings; the
//! bus fans out synchronously to every listener registered for a topic, in
//! registration order. Nothing is queued or replayed: an emission with no
//! listeners is dropped.
//!
//! ```text
//! emit("start", args)
//!     │
//!     ├──► listener #1 (args)
//!     ├──► listener #2 (args)
//!     └──► listener #3 (args)   registration order, same call stack
//! ```
//!
//! The lifecycle topics every component emits are listed in [`topics`].

mod bus;
pub mod topics;

pub use bus::{EventBus, Listener, SubscriptionId};
