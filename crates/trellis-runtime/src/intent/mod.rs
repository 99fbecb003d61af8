//! Intent routing.
//!
//! ```text
//! IntentClient::send ──► Channel("/core").emit("request_intent", intent, ack)
//!                                  │
//!                                  ▼
//!                         IntentServer (bound per connection)
//!                                  │
//!                                  ▼
//!                IntentRouter::dispatch ── authorize_layers ── handler
//!                                  │
//!   future resolves / rejects ◄────┴──── Ack (exactly once)
//! ```

mod ack;
mod client;
mod error;
mod handler;
mod router;
mod server;
mod session;

pub use ack::Ack;
pub use client::{IntentClient, DEFAULT_NAMESPACE};
pub use error::{ErrorPayload, IntentError};
pub use handler::{handler_fn, FnHandler, IntentHandler};
pub use router::{DispatchOutcome, IntentRouter};
pub use server::{IntentServer, INTENT_EVENT};
pub use session::{SessionData, SessionHandle};
