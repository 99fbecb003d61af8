//! Trellis runtime: intent routing over channels.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  emit("request_intent")  ┌──────────────┐
//! │ IntentClient │ ───────────────────────► │ IntentServer │
//! └──────┬───────┘                          └──────┬───────┘
//!        │ ChannelRegistry::get_channel            │ IntentRouter::dispatch
//!        ▼                                         ▼
//!   Channel ("/core", ...)              authorize_layers → IntentHandler
//!                                                  │
//!        ◄─────────────── ack(null | {code, message})
//! ```
//!
//! [`RuntimeContext`] builds all of the above from a
//! [`config::TrellisConfig`], and [`logging::init_tracing`] installs the
//! subscriber it describes.
//!
//! # Example
//!
//! ```
//! use trellis_auth::AuthorizationRequirement;
//! use trellis_runtime::config::TrellisConfig;
//! use trellis_runtime::intent::{handler_fn, SessionHandle};
//! use trellis_runtime::RuntimeContext;
//! use trellis_types::Intent;
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let runtime = RuntimeContext::new(TrellisConfig::default());
//! runtime
//!     .router()
//!     .register(
//!         "cart",
//!         "add",
//!         handler_fn(|_, _, ack| {
//!             ack.ok();
//!         }),
//!         AuthorizationRequirement::new(),
//!     )
//!     .expect("register");
//! runtime.bind("/core", SessionHandle::new()).expect("bind");
//!
//! runtime.client().send(Intent::new("cart", "add")).await.expect("acked");
//! # }
//! ```

pub mod channel;
pub mod config;
mod context;
pub mod intent;
pub mod logging;

pub use context::RuntimeContext;
