//! ComponentNode - one live component instance.
//!
//! A node bundles identity, lifecycle state, its own [`EventBus`], a
//! [`ChildScope`] for sub-components and the component-level
//! [`AuthorizationRequirement`]. Behaviour is delegated to a boxed
//! [`Component`].
//!
//! # Transitions
//!
//! Each transition takes the behaviour lock, validates the move, runs the
//! hook and only then commits the state and emits the lifecycle topic.
//! The topic is emitted after the lock is released, so `start` listeners
//! (including pending handles) may freely inspect the node.

use crate::component::NodeContext;
use crate::{
    ChildScope, Component, DependencyResolver, LifecycleError, LifecycleState, NoopComponent,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use trellis_auth::{AuthorizationRequirement, EvaluatorFault, SecurityContext};
use trellis_event::{topics, EventBus};
use trellis_types::{ComponentId, Sid};

/// A component instance in the tree.
pub struct ComponentNode {
    id: ComponentId,
    sid: Option<Sid>,
    state: Mutex<LifecycleState>,
    bus: EventBus,
    children: ChildScope,
    requirement: AuthorizationRequirement,
    behavior: Mutex<Box<dyn Component>>,
}

impl ComponentNode {
    /// Starts building a node named `name` at `version`.
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ComponentNodeBuilder {
        ComponentNodeBuilder {
            id: ComponentId::new(name, version),
            sid: None,
            requirement: AuthorizationRequirement::new(),
            behavior: Box::new(NoopComponent),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Identifier under which this node is addressed by its parent.
    #[must_use]
    pub fn sid(&self) -> Option<&Sid> {
        self.sid.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn children(&self) -> &ChildScope {
        &self.children
    }

    /// Resolver over this node's children.
    #[must_use]
    pub fn resolver(&self) -> DependencyResolver {
        self.children.resolver()
    }

    #[must_use]
    pub fn requirement(&self) -> &AuthorizationRequirement {
        &self.requirement
    }

    /// Checks `ctx` against the component-level requirement.
    ///
    /// # Errors
    ///
    /// Propagates a faulting dynamic condition.
    pub fn authorize(&self, ctx: &SecurityContext) -> Result<bool, EvaluatorFault> {
        self.requirement.evaluate(ctx)
    }

    // ─── Transitions ────────────────────────────────────────────────────

    /// `Created → Initialized`, running the `init` hook.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] from any other state, or
    /// [`LifecycleError::Hook`] when the hook fails.
    pub fn initialize(&self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Initialized, "init", |behavior, ctx| {
            behavior.init(ctx)
        })?;
        self.announce(topics::INIT);
        Ok(())
    }

    /// `Initialized → Started`, running the `start` hook. Handles waiting
    /// on this node resolve when the `start` topic fires.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentNode::initialize`].
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Started, "start", |behavior, ctx| {
            behavior.start(ctx)
        })?;
        self.announce(topics::START);
        Ok(())
    }

    /// Initializes (if still `Created`) and starts.
    ///
    /// # Errors
    ///
    /// The first failing transition.
    pub fn boot(&self) -> Result<(), LifecycleError> {
        if self.state() == LifecycleState::Created {
            self.initialize()?;
        }
        self.start()
    }

    /// Destroys children first, then this node.
    ///
    /// Closing the child scope rejects every handle still pending on it.
    /// After the `destroy` topic is emitted the bus is cleared.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] when already destroyed.
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        {
            let state = self.state();
            if !state.can_transition_to(LifecycleState::Destroyed) {
                return Err(self.invalid(state, LifecycleState::Destroyed));
            }
        }
        self.children.close();
        self.transition(LifecycleState::Destroyed, "destroy", |behavior, ctx| {
            behavior.destroy(ctx);
            Ok(())
        })?;
        self.announce(topics::DESTROY);
        self.bus.clear();
        Ok(())
    }

    fn transition<F>(
        &self,
        to: LifecycleState,
        hook: &'static str,
        run: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut dyn Component, &NodeContext<'_>) -> Result<(), crate::ComponentError>,
    {
        let mut behavior = self.behavior.lock();

        let from = self.state();
        if !from.can_transition_to(to) {
            return Err(self.invalid(from, to));
        }

        run(behavior.as_mut(), &NodeContext::new(self)).map_err(|source| {
            tracing::warn!(component = %self.id, hook, error = %source, "lifecycle hook failed");
            LifecycleError::Hook {
                component: self.id.fqn(),
                hook,
                source,
            }
        })?;

        *self.state.lock() = to;
        tracing::debug!(component = %self.id, sid = ?self.sid, %from, %to, "lifecycle transition");
        Ok(())
    }

    fn invalid(&self, from: LifecycleState, to: LifecycleState) -> LifecycleError {
        LifecycleError::InvalidTransition {
            component: self.id.fqn(),
            from,
            to,
        }
    }

    fn announce(&self, topic: &str) {
        self.bus.emit(topic, &[self.describe()]);
    }

    fn describe(&self) -> Value {
        json!({
            "name": self.id.name,
            "version": self.id.version,
            "instance": self.id.instance.to_string(),
            "sid": self.sid.as_ref().map(Sid::as_str),
        })
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("id", &self.id)
            .field("sid", &self.sid)
            .field("state", &self.state())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ComponentNode`].
pub struct ComponentNodeBuilder {
    id: ComponentId,
    sid: Option<Sid>,
    requirement: AuthorizationRequirement,
    behavior: Box<dyn Component>,
}

impl ComponentNodeBuilder {
    /// Sets the identifier the parent addresses this node by.
    #[must_use]
    pub fn sid(mut self, sid: impl Into<Sid>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    #[must_use]
    pub fn requirement(mut self, requirement: AuthorizationRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    #[must_use]
    pub fn behavior(mut self, behavior: impl Component + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<ComponentNode> {
        let owner = match &self.sid {
            Some(sid) => format!("{}:{}", self.id.fqn(), sid),
            None => self.id.fqn(),
        };
        Arc::new(ComponentNode {
            id: self.id,
            sid: self.sid,
            state: Mutex::new(LifecycleState::Created),
            bus: EventBus::new(),
            children: ChildScope::new(owner),
            requirement: self.requirement,
            behavior: Mutex::new(self.behavior),
        })
    }
}
