//! IntentRouter - server-side `(category, action)` → handler dispatch.
//!
//! # Dispatch
//!
//! ```text
//! dispatch(intent, ctx, session, ack)
//!   │
//!   ├─ route lookup ────────── missing ──► ack(HANDLER_NOT_FOUND)
//!   │
//!   ├─ component layer ─┐
//!   ├─ handler layer  ──┴──── denied  ──► ack(UNAUTHORIZED)
//!   │                   └──── fault   ──► ack(EVALUATOR_FAULT)
//!   │
//!   └─ handler(context, session, ack)
//! ```
//!
//! The component layer is the requirement guarding the intent's category,
//! set from configuration with [`IntentRouter::guard_component`] and from
//! the requirement attached to a component with
//! [`IntentRouter::guard_node`]. The handler layer is the requirement given
//! at registration. Every decision is audit-logged.

use super::{Ack, IntentError, IntentHandler, SessionHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_auth::{authorize_layers, AuthorizationRequirement, Decision, SecurityContext};
use trellis_component::ComponentNode;
use trellis_types::{Intent, IntentKey};

/// What [`IntentRouter::dispatch`] did with an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran.
    Invoked,
    NotFound,
    Denied,
    /// A dynamic condition faulted.
    Faulted,
}

struct Route {
    handler: Arc<dyn IntentHandler>,
    requirement: AuthorizationRequirement,
}

/// Route table plus per-category component requirements.
#[derive(Default)]
pub struct IntentRouter {
    routes: RwLock<HashMap<IntentKey, Arc<Route>>>,
    components: RwLock<HashMap<String, AuthorizationRequirement>>,
}

impl IntentRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `(category, action)`.
    ///
    /// # Errors
    ///
    /// [`IntentError::RegistrationConflict`] when the key is taken.
    pub fn register<H>(
        &self,
        category: impl Into<String>,
        action: impl Into<String>,
        handler: H,
        requirement: AuthorizationRequirement,
    ) -> Result<(), IntentError>
    where
        H: IntentHandler + 'static,
    {
        self.register_shared(IntentKey::new(category, action), Arc::new(handler), requirement)
    }

    /// Registers an already shared handler.
    ///
    /// # Errors
    ///
    /// [`IntentError::RegistrationConflict`] when the key is taken.
    pub fn register_shared(
        &self,
        key: IntentKey,
        handler: Arc<dyn IntentHandler>,
        requirement: AuthorizationRequirement,
    ) -> Result<(), IntentError> {
        let mut routes = self.routes.write();
        if routes.contains_key(&key) {
            tracing::error!(intent = %key, "duplicate intent handler registration");
            return Err(IntentError::RegistrationConflict { key });
        }
        tracing::debug!(
            intent = %key,
            permissions = requirement.static_permissions.len(),
            conditions = requirement.dynamic_conditions.len(),
            "intent handler registered"
        );
        routes.insert(
            key,
            Arc::new(Route {
                handler,
                requirement,
            }),
        );
        Ok(())
    }

    /// Removes the handler for `(category, action)`.
    pub fn unregister(&self, category: &str, action: &str) -> bool {
        self.routes
            .write()
            .remove(&IntentKey::new(category, action))
            .is_some()
    }

    /// Sets the component-level requirement for every intent of `category`,
    /// replacing any previous one.
    pub fn guard_component(
        &self,
        category: impl Into<String>,
        requirement: AuthorizationRequirement,
    ) {
        self.components.write().insert(category.into(), requirement);
    }

    /// Adds the requirement attached to `node` to the component layer of
    /// the category named after it.
    ///
    /// The node's requirement is combined with any existing guard for that
    /// category: a caller must satisfy both.
    pub fn guard_node(&self, node: &ComponentNode) {
        let category = node.id().name.clone();
        let mut components = self.components.write();
        let combined = components
            .remove(&category)
            .unwrap_or_default()
            .and(node.requirement());
        tracing::debug!(
            %category,
            component = %node.id(),
            permissions = combined.static_permissions.len(),
            conditions = combined.dynamic_conditions.len(),
            "component node guarded"
        );
        components.insert(category, combined);
    }

    /// The component-layer requirement applied to `category`.
    #[must_use]
    pub fn component_requirement(&self, category: &str) -> AuthorizationRequirement {
        self.components
            .read()
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, key: &IntentKey) -> bool {
        self.routes.read().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Routes one intent.
    ///
    /// Every failure is reported through `ack`; the returned outcome is for
    /// the caller's bookkeeping only.
    pub async fn dispatch(
        &self,
        intent: Intent,
        ctx: &SecurityContext,
        session: SessionHandle,
        ack: Ack,
    ) -> DispatchOutcome {
        let key = intent.key();

        let Some(route) = self.routes.read().get(&key).cloned() else {
            tracing::warn!(intent = %key, "no handler for intent");
            ack.err(IntentError::HandlerNotFound { key });
            return DispatchOutcome::NotFound;
        };
        let component = self.component_requirement(&intent.category);

        match authorize_layers(ctx, &component, &route.requirement) {
            Ok(Decision::Allowed) => {
                tracing::debug!(intent = %key, "intent allowed");
            }
            Ok(Decision::Denied { layer, reason }) => {
                tracing::warn!(intent = %key, %layer, %reason, "intent denied");
                ack.err(IntentError::Unauthorized { key, layer, reason });
                return DispatchOutcome::Denied;
            }
            Err(fault) => {
                tracing::error!(
                    intent = %key,
                    condition = %fault.condition,
                    error = %fault.source,
                    "authorization fault"
                );
                ack.err(IntentError::EvaluatorFault { key, source: fault });
                return DispatchOutcome::Faulted;
            }
        }

        route.handler.handle(intent.context, session, ack).await;
        DispatchOutcome::Invoked
    }
}

impl fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.routes.read().keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("IntentRouter")
            .field("routes", &keys)
            .field("guarded", &self.components.read().len())
            .finish()
    }
}
