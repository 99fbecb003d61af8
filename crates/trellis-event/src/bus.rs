//! EventBus - per-component publish/subscribe.
//!
//! # Listener Identity
//!
//! Closures have no identity to compare, so [`EventBus::on`] returns a
//! [`SubscriptionId`] and [`EventBus::remove_on`] takes it back. Registering
//! the same closure twice yields two ids and two invocations per emit.
//!
//! # Reentrancy
//!
//! `emit` snapshots the listener list and releases the lock before calling
//! out, so listeners may subscribe, unsubscribe or emit on the same bus.
//! Changes made during an emission apply from the next emission on.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A topic listener. Receives the emitted arguments.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Handle to one registration, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    listener: Listener,
    once: bool,
}

/// Topic → ordered listeners.
///
/// # Example
///
/// ```
/// use trellis_event::EventBus;
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// bus.on("clicked", move |args| sink.lock().unwrap().push(args[0].clone()));
///
/// assert_eq!(bus.emit("clicked", &[json!("ok")]), 1);
/// assert_eq!(*seen.lock().unwrap(), vec![json!("ok")]);
/// ```
pub struct EventBus {
    topics: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers `listener` for `topic`.
    ///
    /// The topic's list is created on first use. No de-duplication.
    pub fn on<F>(&self, topic: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.subscribe(topic.into(), Arc::new(listener), false)
    }

    /// Registers a listener that is removed right before its first call.
    pub fn once<F>(&self, topic: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.subscribe(topic.into(), Arc::new(listener), true)
    }

    fn subscribe(&self, topic: String, listener: Listener, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.topics.lock().entry(topic).or_default().push(Subscriber {
            id,
            listener,
            once,
        });
        id
    }

    /// Calls every listener currently registered for `topic`, in
    /// registration order, and returns how many were called.
    ///
    /// A topic without listeners is a no-op; the emission is lost.
    pub fn emit(&self, topic: &str, args: &[Value]) -> usize {
        let listeners: Vec<Listener> = {
            let mut topics = self.topics.lock();
            let Some(subscribers) = topics.get_mut(topic) else {
                tracing::trace!(topic, "emit without listeners");
                return 0;
            };
            let snapshot: Vec<Listener> = subscribers
                .iter()
                .map(|s| Arc::clone(&s.listener))
                .collect();
            subscribers.retain(|s| !s.once);
            if subscribers.is_empty() {
                topics.remove(topic);
            }
            snapshot
        };

        for listener in &listeners {
            listener(args);
        }
        listeners.len()
    }

    /// Removes one registration.
    ///
    /// Returns `false` (and does nothing else) when the registration is not
    /// present, e.g. already removed or a fired `once` listener.
    pub fn remove_on(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.lock();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Number of listeners registered for `topic`.
    #[must_use]
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, Vec::len)
    }

    /// Drops every listener on every topic.
    pub fn clear(&self) {
        self.topics.lock().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.lock();
        let mut map = f.debug_map();
        for (topic, subscribers) in topics.iter() {
            map.entry(topic, &subscribers.len());
        }
        map.finish()
    }
}
