//! ComponentHandle - a deferred reference to a child that may not exist yet.
//!
//! ```text
//!            resolve(node)
//! Pending ─────────────────► Resolved(node)
//!    │
//!    │       reject(err)
//!    └─────────────────────► Rejected(err)
//! ```
//!
//! A handle settles at most once. Continuations registered while pending
//! run in registration order when it settles; continuations registered
//! afterwards run immediately with the stored outcome. Clones share state.

use crate::{ComponentNode, ResolveError};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use trellis_types::Sid;

/// Outcome delivered to handle continuations.
pub type Resolution = Result<Arc<ComponentNode>, ResolveError>;

type Waiter = Box<dyn FnOnce(Resolution) + Send>;

enum Slot {
    Pending(Vec<Waiter>),
    Resolved(Arc<ComponentNode>),
    Rejected(ResolveError),
}

/// Shared, single-assignment reference to a child component.
#[derive(Clone)]
pub struct ComponentHandle {
    sid: Sid,
    slot: Arc<Mutex<Slot>>,
}

impl ComponentHandle {
    pub(crate) fn pending(sid: Sid) -> Self {
        Self {
            sid,
            slot: Arc::new(Mutex::new(Slot::Pending(Vec::new()))),
        }
    }

    pub(crate) fn resolved(sid: Sid, node: Arc<ComponentNode>) -> Self {
        Self {
            sid,
            slot: Arc::new(Mutex::new(Slot::Resolved(node))),
        }
    }

    pub(crate) fn rejected(sid: Sid, err: ResolveError) -> Self {
        Self {
            sid,
            slot: Arc::new(Mutex::new(Slot::Rejected(err))),
        }
    }

    #[must_use]
    pub fn sid(&self) -> &Sid {
        &self.sid
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Pending(_))
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Resolved(_))
    }

    /// The resolved component, if any.
    #[must_use]
    pub fn component(&self) -> Option<Arc<ComponentNode>> {
        match &*self.slot.lock() {
            Slot::Resolved(node) => Some(Arc::clone(node)),
            Slot::Pending(_) | Slot::Rejected(_) => None,
        }
    }

    /// Continuations still waiting for this handle to settle.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        match &*self.slot.lock() {
            Slot::Pending(waiters) => waiters.len(),
            Slot::Resolved(_) | Slot::Rejected(_) => 0,
        }
    }

    /// `true` when both values refer to the same underlying handle.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Runs `continuation` once the handle settles, or right away if it
    /// already has.
    pub fn when_resolved<F>(&self, continuation: F)
    where
        F: FnOnce(Resolution) + Send + 'static,
    {
        let outcome = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending(waiters) => {
                    waiters.push(Box::new(continuation));
                    return;
                }
                Slot::Resolved(node) => Ok(Arc::clone(node)),
                Slot::Rejected(err) => Err(err.clone()),
            }
        };
        continuation(outcome);
    }

    /// Waits for the handle to settle.
    ///
    /// The returned future owns everything it needs; registration happens
    /// when this method is called, not when the future is first polled.
    ///
    /// # Errors
    ///
    /// The rejection reason, or [`ResolveError::Abandoned`] when every
    /// reference to the pending handle is dropped.
    pub fn wait(&self) -> impl Future<Output = Resolution> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.when_resolved(move |outcome| {
            let _ = tx.send(outcome);
        });
        let sid = self.sid.clone();
        async move { rx.await.unwrap_or(Err(ResolveError::Abandoned { sid })) }
    }

    /// [`ComponentHandle::wait`] with an optional upper bound.
    ///
    /// `None` waits indefinitely. A timeout does not settle the handle:
    /// other waiters keep waiting.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Timeout`] when `timeout` elapses first.
    pub fn wait_timeout(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Resolution> + Send + 'static {
        let waiting = self.wait();
        let sid = self.sid.clone();
        async move {
            match timeout {
                None => waiting.await,
                Some(limit) => tokio::time::timeout(limit, waiting)
                    .await
                    .unwrap_or(Err(ResolveError::Timeout { sid })),
            }
        }
    }

    /// Settles the handle with `node`. Returns `false` if already settled.
    pub(crate) fn resolve(&self, node: Arc<ComponentNode>) -> bool {
        self.settle(Ok(node))
    }

    /// Settles the handle with `err`. Returns `false` if already settled.
    pub(crate) fn reject(&self, err: ResolveError) -> bool {
        self.settle(Err(err))
    }

    fn settle(&self, outcome: Resolution) -> bool {
        let waiters = {
            let mut slot = self.slot.lock();
            let Slot::Pending(waiters) = &mut *slot else {
                tracing::trace!(sid = %self.sid, "handle already settled");
                return false;
            };
            let waiters = std::mem::take(waiters);
            *slot = match &outcome {
                Ok(node) => Slot::Resolved(Arc::clone(node)),
                Err(err) => Slot::Rejected(err.clone()),
            };
            waiters
        };

        match &outcome {
            Ok(node) => {
                tracing::debug!(
                    sid = %self.sid,
                    component = %node.id(),
                    waiters = waiters.len(),
                    "handle resolved"
                );
            }
            Err(err) => {
                tracing::debug!(
                    sid = %self.sid,
                    error = %err,
                    waiters = waiters.len(),
                    "handle rejected"
                );
            }
        }
        for waiter in waiters {
            waiter(outcome.clone());
        }
        true
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.lock() {
            Slot::Pending(_) => "pending",
            Slot::Resolved(_) => "resolved",
            Slot::Rejected(_) => "rejected",
        };
        f.debug_struct("ComponentHandle")
            .field("sid", &self.sid)
            .field("state", &state)
            .finish()
    }
}
