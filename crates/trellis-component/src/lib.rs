//! Component tree for Trellis.
//!
//! # Overview
//!
//! ```text
//! ComponentNode (page)
//! ├── EventBus                 init / start / destroy + custom topics
//! ├── AuthorizationRequirement component-level access
//! └── ChildScope
//!     ├── "header" → ComponentNode
//!     ├── "cart"   → ComponentNode
//!     └── handles  → ComponentHandle per requested sid
//! ```
//!
//! Children attach and start in any order. Code that needs a sibling asks
//! the parent's [`DependencyResolver`] for a [`ComponentHandle`], which
//! resolves when that child emits `start` and is rejected if the parent is
//! destroyed first.
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | `component` | [`Component`] hooks, [`NodeContext`] |
//! | `lifecycle` | [`LifecycleState`] |
//! | `node` | [`ComponentNode`] and its builder |
//! | `scope` | [`ChildScope`] |
//! | `handle` | [`ComponentHandle`] |
//! | `resolver` | [`DependencyResolver`] |
//! | `error` | [`ComponentError`], [`LifecycleError`], [`ResolveError`] |

mod component;
mod error;
mod handle;
mod lifecycle;
mod node;
mod resolver;
mod scope;

pub use component::{Component, NodeContext, NoopComponent};
pub use error::{ComponentError, LifecycleError, ResolveError};
pub use handle::{ComponentHandle, Resolution};
pub use lifecycle::LifecycleState;
pub use node::{ComponentNode, ComponentNodeBuilder};
pub use resolver::{DependencyResolver, ResolvedSet};
pub use scope::ChildScope;
