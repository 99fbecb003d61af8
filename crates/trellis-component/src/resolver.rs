//! DependencyResolver - ordering-independent access to sibling components.
//!
//! Components attach in any order. A resolver lets one component express
//! "when `cart` has started, give it to me" without caring whether `cart`
//! exists yet.
//!
//! | Operation | Returns | Settles when |
//! |-----------|---------|--------------|
//! | [`get`](DependencyResolver::get) | [`ComponentHandle`] | the child emits `start` |
//! | [`all`](DependencyResolver::all) | future of [`ResolvedSet`] | every member resolved, or the first rejects |
//! | [`on`](DependencyResolver::on) | [`ComponentHandle`] | listener subscribed on resolution |
//!
//! # Example
//!
//! ```
//! use trellis_component::ComponentNode;
//!
//! let page = ComponentNode::builder("page", "1").build();
//! let cart = page.resolver().get("cart");
//! assert!(cart.is_pending());
//!
//! let child = ComponentNode::builder("cart", "1").sid("cart").build();
//! page.children().attach(child.clone()).expect("attach");
//! child.boot().expect("boot");
//!
//! assert!(cart.is_resolved());
//! ```

use crate::{ChildScope, ComponentHandle, ComponentNode, ResolveError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use trellis_types::Sid;

/// Components produced by [`DependencyResolver::all`], keyed by sid.
pub type ResolvedSet = HashMap<Sid, Arc<ComponentNode>>;

/// Resolves children of one scope. Cheap to clone.
#[derive(Clone)]
pub struct DependencyResolver {
    scope: ChildScope,
}

impl DependencyResolver {
    pub(crate) fn new(scope: ChildScope) -> Self {
        Self { scope }
    }

    /// Handle for the child `sid`.
    ///
    /// Repeated calls return the same handle, and at most one `start`
    /// listener is placed on the child.
    pub fn get(&self, sid: impl Into<Sid>) -> ComponentHandle {
        self.scope.handle_for(&sid.into())
    }

    /// Waits for every sid in `sids`.
    ///
    /// Continuations are registered immediately, so resolutions that occur
    /// before the future is polled are not missed. Duplicate sids are
    /// collapsed; an empty set resolves at once.
    ///
    /// # Errors
    ///
    /// [`ResolveError::AggregateRejected`] for the first member to reject.
    /// Later outcomes are ignored.
    pub fn all<I, S>(
        &self,
        sids: I,
    ) -> impl Future<Output = Result<ResolvedSet, ResolveError>> + Send + 'static
    where
        I: IntoIterator<Item = S>,
        S: Into<Sid>,
    {
        self.all_timeout(sids, None)
    }

    /// [`DependencyResolver::all`] with an optional upper bound.
    ///
    /// # Errors
    ///
    /// [`ResolveError::AggregateTimeout`] listing the sids still pending
    /// when `timeout` elapses.
    pub fn all_timeout<I, S>(
        &self,
        sids: I,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<ResolvedSet, ResolveError>> + Send + 'static
    where
        I: IntoIterator<Item = S>,
        S: Into<Sid>,
    {
        let (aggregate, rx) = self.collect(sids);
        async move {
            let settled = match timeout {
                None => rx.await,
                Some(limit) => match tokio::time::timeout(limit, rx).await {
                    Ok(settled) => settled,
                    Err(_) => return Err(aggregate.timed_out()),
                },
            };
            settled.unwrap_or_else(|_| Err(aggregate.abandoned()))
        }
    }

    /// Subscribes `listener` to `topic` on the child `sid` once it resolves.
    ///
    /// Nothing happens while the child is unresolved; a rejection is logged
    /// and the listener dropped.
    pub fn on<F>(
        &self,
        sid: impl Into<Sid>,
        topic: impl Into<String>,
        listener: F,
    ) -> ComponentHandle
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let handle = self.get(sid);
        let topic = topic.into();
        let sid = handle.sid().clone();
        handle.when_resolved(move |outcome| match outcome {
            Ok(node) => {
                node.bus().on(topic, listener);
            }
            Err(err) => {
                tracing::debug!(
                    %sid,
                    %topic,
                    error = %err,
                    "dependency rejected; listener dropped"
                );
            }
        });
        handle
    }

    fn collect<I, S>(&self, sids: I) -> (Arc<Aggregate>, oneshot::Receiver<AggregateOutcome>)
    where
        I: IntoIterator<Item = S>,
        S: Into<Sid>,
    {
        let wanted: BTreeSet<Sid> = sids.into_iter().map(Into::into).collect();
        let (tx, rx) = oneshot::channel();
        let aggregate = Arc::new(Aggregate {
            state: Mutex::new(AggregateState {
                remaining: wanted.clone(),
                resolved: HashMap::with_capacity(wanted.len()),
                tx: Some(tx),
            }),
        });

        if wanted.is_empty() {
            aggregate.finish(Ok(ResolvedSet::new()));
            return (aggregate, rx);
        }

        for sid in wanted {
            let handle = self.get(sid.clone());
            let member = Arc::clone(&aggregate);
            handle.when_resolved(move |outcome| member.settle(sid, outcome));
        }
        (aggregate, rx)
    }
}

type AggregateOutcome = Result<ResolvedSet, ResolveError>;

struct AggregateState {
    remaining: BTreeSet<Sid>,
    resolved: ResolvedSet,
    tx: Option<oneshot::Sender<AggregateOutcome>>,
}

struct Aggregate {
    state: Mutex<AggregateState>,
}

impl Aggregate {
    fn settle(&self, sid: Sid, outcome: Result<Arc<ComponentNode>, ResolveError>) {
        let mut state = self.state.lock();
        if state.tx.is_none() {
            return;
        }
        match outcome {
            Ok(node) => {
                state.remaining.remove(&sid);
                state.resolved.insert(sid, node);
                if state.remaining.is_empty() {
                    let resolved = std::mem::take(&mut state.resolved);
                    send(&mut state, Ok(resolved));
                }
            }
            Err(source) => {
                send(
                    &mut state,
                    Err(ResolveError::AggregateRejected {
                        sid,
                        source: Box::new(source),
                    }),
                );
            }
        }
    }

    fn finish(&self, outcome: AggregateOutcome) {
        send(&mut self.state.lock(), outcome);
    }

    fn pending(&self) -> Vec<Sid> {
        self.state.lock().remaining.iter().cloned().collect()
    }

    fn timed_out(&self) -> ResolveError {
        ResolveError::AggregateTimeout {
            pending: self.pending(),
        }
    }

    fn abandoned(&self) -> ResolveError {
        let sid = self
            .pending()
            .into_iter()
            .next()
            .unwrap_or_else(|| Sid::new(""));
        ResolveError::Abandoned { sid }
    }
}

fn send(state: &mut AggregateState, outcome: AggregateOutcome) {
    if let Some(tx) = state.tx.take() {
        let _ = tx.send(outcome);
    }
}
