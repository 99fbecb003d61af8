//! Core types for Trellis.
//!
//! This crate holds the vocabulary shared by every other Trellis crate:
//! component identity, intents, and the [`ErrorCode`] interface.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Component SDK Layer                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  trellis-types     : ComponentId, Sid, Intent  ◄── HERE      │
//! │  trellis-auth      : SecurityContext, authorize             │
//! │  trellis-event     : EventBus                               │
//! │  trellis-component : Component, ComponentHandle, Resolver   │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  trellis-runtime   : intent router, channels, config        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use trellis_types::{ComponentId, Intent, Sid};
//!
//! let id = ComponentId::new("header", "1.2.0");
//! assert_eq!(id.fqn(), "header@1.2.0");
//!
//! let sid = Sid::from("nav");
//! assert_eq!(sid.as_str(), "nav");
//!
//! let intent = Intent::new("cart", "add").with_context("sku", "A-1");
//! assert_eq!(intent.key().to_string(), "cart.add");
//! ```

mod error;
mod id;
mod intent;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ComponentId, Sid};
pub use intent::{Intent, IntentContext, IntentKey};
