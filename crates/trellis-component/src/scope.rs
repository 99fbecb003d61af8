//! ChildScope - the children of one node, keyed by sid.
//!
//! The scope also memoizes one [`ComponentHandle`] per sid, so however
//! many times a dependency is requested, a single `start` listener is
//! registered on the child.
//!
//! ```text
//! ChildScope
//! ├── children: sid → Arc<ComponentNode>
//! ├── handles:  sid → ComponentHandle      (memo)
//! └── closed:   set once the owner is destroyed
//! ```
//!
//! # Lock Ordering
//!
//! The scope lock may be held while reading a child's state or
//! subscribing on its bus. Child destruction and handle settlement always
//! happen after the scope lock is released.

use crate::{ComponentHandle, ComponentNode, DependencyResolver, LifecycleError, ResolveError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_event::topics;
use trellis_types::Sid;

#[derive(Default)]
struct ScopeState {
    children: HashMap<Sid, Arc<ComponentNode>>,
    handles: HashMap<Sid, ComponentHandle>,
    closed: bool,
}

struct ScopeShared {
    owner: String,
    state: Mutex<ScopeState>,
}

/// Children of a node. Clones share the same scope.
#[derive(Clone)]
pub struct ChildScope {
    shared: Arc<ScopeShared>,
}

impl ChildScope {
    pub(crate) fn new(owner: String) -> Self {
        Self {
            shared: Arc::new(ScopeShared {
                owner,
                state: Mutex::new(ScopeState::default()),
            }),
        }
    }

    /// Resolver bound to this scope.
    #[must_use]
    pub fn resolver(&self) -> DependencyResolver {
        DependencyResolver::new(self.clone())
    }

    /// Adds `child` under its sid and returns whatever it replaced.
    ///
    /// A replaced instance is destroyed and its memoized handle forgotten,
    /// so later lookups bind to the new instance. A handle still pending
    /// for this sid is re-armed on the new child.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::MissingSid`] when the child has no sid, and
    /// [`LifecycleError::ScopeClosed`] after the owner was destroyed.
    pub fn attach(
        &self,
        child: Arc<ComponentNode>,
    ) -> Result<Option<Arc<ComponentNode>>, LifecycleError> {
        let sid = child
            .sid()
            .cloned()
            .ok_or_else(|| LifecycleError::MissingSid {
                component: child.id().fqn(),
            })?;

        let (replaced, pending) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(LifecycleError::ScopeClosed {
                    owner: self.shared.owner.clone(),
                });
            }
            let replaced = state
                .children
                .insert(sid.clone(), Arc::clone(&child))
                .filter(|old| !Arc::ptr_eq(old, &child));
            if replaced.is_some() {
                forget_settled(&mut state, sid.as_str());
            }
            let pending = state.handles.get(&sid).filter(|h| h.is_pending()).cloned();
            (replaced, pending)
        };

        tracing::debug!(
            owner = %self.shared.owner,
            %sid,
            component = %child.id(),
            replaced = replaced.is_some(),
            "child attached"
        );

        if let Some(old) = &replaced {
            retire(old);
        }
        if let Some(handle) = pending {
            arm(&child, handle);
        }
        Ok(replaced)
    }

    /// Removes and destroys the child under `sid`.
    pub fn detach(&self, sid: &str) -> Option<Arc<ComponentNode>> {
        let removed = {
            let mut state = self.shared.state.lock();
            let removed = state.children.remove(sid)?;
            forget_settled(&mut state, sid);
            removed
        };
        tracing::debug!(owner = %self.shared.owner, sid, "child detached");
        retire(&removed);
        Some(removed)
    }

    #[must_use]
    pub fn child(&self, sid: &str) -> Option<Arc<ComponentNode>> {
        self.shared.state.lock().children.get(sid).cloned()
    }

    /// Sids of every attached child, sorted.
    #[must_use]
    pub fn sids(&self) -> Vec<Sid> {
        let mut sids: Vec<Sid> = self.shared.state.lock().children.keys().cloned().collect();
        sids.sort();
        sids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Memoized handle for `sid`.
    pub(crate) fn handle_for(&self, sid: &Sid) -> ComponentHandle {
        let (handle, watch) = {
            let mut state = self.shared.state.lock();

            if let Some(existing) = state.handles.get(sid) {
                let stale = existing
                    .component()
                    .is_some_and(|node| node.state().is_destroyed());
                if !stale {
                    return existing.clone();
                }
                state.handles.remove(sid);
            }

            if state.closed {
                return ComponentHandle::rejected(
                    sid.clone(),
                    ResolveError::ScopeClosed { sid: sid.clone() },
                );
            }

            let child = state.children.get(sid).cloned();
            let handle = match &child {
                Some(node) if node.state().is_started() => {
                    ComponentHandle::resolved(sid.clone(), Arc::clone(node))
                }
                _ => ComponentHandle::pending(sid.clone()),
            };
            state.handles.insert(sid.clone(), handle.clone());
            let watch = child.filter(|_| handle.is_pending());
            (handle, watch)
        };

        if let Some(child) = watch {
            arm(&child, handle.clone());
        }
        handle
    }

    /// Marks the scope closed, destroys every child and rejects handles
    /// that are still pending.
    pub(crate) fn close(&self) {
        let (children, handles) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.handles),
            )
        };

        for child in children.values() {
            retire(child);
        }
        let mut rejected = 0usize;
        for (sid, handle) in handles {
            if handle.reject(ResolveError::ScopeClosed { sid }) {
                rejected += 1;
            }
        }
        tracing::debug!(
            owner = %self.shared.owner,
            children = children.len(),
            rejected,
            "child scope closed"
        );
    }
}

/// Drops a memoized handle that can no longer change.
fn forget_settled(state: &mut ScopeState, sid: &str) {
    if state.handles.get(sid).is_some_and(|h| !h.is_pending()) {
        state.handles.remove(sid);
    }
}

fn retire(node: &ComponentNode) {
    if node.state().is_destroyed() {
        return;
    }
    if let Err(err) = node.destroy() {
        tracing::warn!(component = %node.id(), error = %err, "failed to destroy child");
    }
}

/// Resolves `handle` when `child` emits `start`.
fn arm(child: &Arc<ComponentNode>, handle: ComponentHandle) {
    let weak = Arc::downgrade(child);
    let on_start = handle.clone();
    let id = child.bus().once(topics::START, move |_| {
        if let Some(node) = weak.upgrade() {
            on_start.resolve(node);
        }
    });

    // The child may have started between the state check and subscribing.
    if child.state().is_started() {
        child.bus().remove_on(topics::START, id);
        handle.resolve(Arc::clone(child));
    }
}
