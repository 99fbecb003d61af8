//! Component trait: behaviour plugged into a [`ComponentNode`].
//!
//! The node owns identity, state, the event bus and children. A
//! [`Component`] only supplies what happens at each transition.
//!
//! | Hook | Runs on | Error effect |
//! |------|---------|--------------|
//! | `init` | `Created → Initialized` | state unchanged, no `init` event |
//! | `start` | `Initialized → Started` | state unchanged, handles stay pending |
//! | `destroy` | `* → Destroyed` | cannot fail |
//!
//! Hooks run while the node holds its behaviour lock. They may read state,
//! subscribe, emit and manage children through the [`NodeContext`], but must
//! not drive a transition of their own node.
//!
//! # Example
//!
//! ```
//! use trellis_component::{Component, ComponentError, ComponentNode, NodeContext};
//!
//! struct Greeter;
//!
//! impl Component for Greeter {
//!     fn start(&mut self, ctx: &NodeContext<'_>) -> Result<(), ComponentError> {
//!         ctx.bus().on("greet", |_| {});
//!         Ok(())
//!     }
//! }
//!
//! let node = ComponentNode::builder("greeter", "1.0").behavior(Greeter).build();
//! node.boot().expect("boot");
//! assert_eq!(node.bus().listener_count("greet"), 1);
//! ```

use crate::{ChildScope, ComponentError, ComponentNode, DependencyResolver, LifecycleState};
use trellis_event::EventBus;
use trellis_types::{ComponentId, Sid};

/// Per-component lifecycle behaviour. Every hook defaults to a no-op.
pub trait Component: Send {
    /// Called on `Created → Initialized`.
    fn init(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called on `Initialized → Started`.
    fn start(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called once on destruction, after every child is destroyed.
    fn destroy(&mut self, _ctx: &NodeContext<'_>) {}
}

/// Behaviour for nodes that only exist to be addressed and subscribed to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopComponent;

impl Component for NoopComponent {}

/// View of the owning node handed to hooks.
pub struct NodeContext<'a> {
    node: &'a ComponentNode,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(node: &'a ComponentNode) -> Self {
        Self { node }
    }

    #[must_use]
    pub fn id(&self) -> &ComponentId {
        self.node.id()
    }

    #[must_use]
    pub fn sid(&self) -> Option<&Sid> {
        self.node.sid()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.node.state()
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        self.node.bus()
    }

    #[must_use]
    pub fn children(&self) -> &ChildScope {
        self.node.children()
    }

    #[must_use]
    pub fn resolver(&self) -> DependencyResolver {
        self.node.resolver()
    }
}
