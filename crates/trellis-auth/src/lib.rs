//! Authorization primitives for Trellis.
//!
//! # Two-Layer Model
//!
//! ```text
//! Authorized = Component(requirement) ∧ Handler(requirement)
//!
//! requirement = StaticPermissions ⊆ user.permissions
//!             ∧ every DynamicCondition(ctx) (ordered, short-circuit)
//! ```
//!
//! | Layer | Attached to | Checked |
//! |-------|-------------|---------|
//! | Component | the component owning an intent category | first |
//! | Handler | one registered `(category, action)` handler | second |
//!
//! Both layers use the same pure [`authorize`] function. A failing
//! predicate is an [`EvaluatorFault`], never a denial.
//!
//! # Crate Architecture
//!
//! ```text
//! trellis-types  (ErrorCode)
//!      ↑
//! trellis-auth   ◄── THIS CRATE
//! (SecurityContext, AuthorizationRequirement, authorize)
//!      ↑
//! trellis-component (component-level requirement)
//!      ↑
//! trellis-runtime   (intent router: both layers per dispatch)
//! ```
//!
//! # Example
//!
//! ```
//! use trellis_auth::{authorize, DynamicCondition, SecurityContext};
//!
//! let ctx = SecurityContext::anonymous()
//!     .with_permission("view_button1")
//!     .with_attribute("location", "US");
//!
//! let in_us = DynamicCondition::from_fn("in_us", |ctx| {
//!     ctx.user.attribute("location").and_then(|v| v.as_str()) == Some("US")
//! });
//!
//! assert!(authorize(&ctx, ["view_button1"], &[in_us]).expect("no fault"));
//! ```

pub mod condition;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod requirement;

pub use condition::{ConditionError, ConditionModule, ConditionScope, DynamicCondition};
pub use context::{SecurityContext, UserContext};
pub use error::{AuthError, EvaluatorFault};
pub use evaluator::{authorize, authorize_layers, Decision, DenialReason, Layer};
pub use requirement::{AuthorizationRequirement, ComponentAccess};
