//! Intent handlers.
//!
//! A handler receives the intent's context, the caller's session and an
//! [`Ack`]. It must answer through the ack exactly once; returning without
//! doing so (and dropping every clone of the ack) answers the sender with
//! `INTENT_ACK_DROPPED`.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use trellis_runtime::intent::{Ack, IntentHandler, SessionHandle};
//! use trellis_types::IntentContext;
//!
//! struct AddToCart;
//!
//! #[async_trait]
//! impl IntentHandler for AddToCart {
//!     async fn handle(&self, _context: IntentContext, session: SessionHandle, ack: Ack) {
//!         let count = session.get("items").and_then(|v| v.as_u64()).unwrap_or(0);
//!         session.insert("items", count + 1);
//!         ack.ok();
//!     }
//! }
//! ```

use super::{Ack, SessionHandle};
use async_trait::async_trait;
use trellis_types::IntentContext;

/// Server-side handler for one `(category, action)`.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, context: IntentContext, session: SessionHandle, ack: Ack);
}

/// Adapter for synchronous closures.
pub struct FnHandler<F>(F);

/// Wraps a closure as an [`IntentHandler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(IntentContext, SessionHandle, Ack) + Send + Sync + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F> IntentHandler for FnHandler<F>
where
    F: Fn(IntentContext, SessionHandle, Ack) + Send + Sync + 'static,
{
    async fn handle(&self, context: IntentContext, session: SessionHandle, ack: Ack) {
        (self.0)(context, session, ack);
    }
}
