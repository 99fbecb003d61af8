//! In-process loopback channel.
//!
//! Emissions are delivered synchronously to the handlers registered on the
//! same [`LocalChannel`]. Only the first handler for an event receives the
//! ack; the rest observe the payload.

use super::{Channel, ChannelError, ChannelFactory, ChannelHandler, TransportAck};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Loopback [`Channel`].
pub struct LocalChannel {
    path: String,
    handlers: RwLock<HashMap<String, Vec<ChannelHandler>>>,
}

impl LocalChannel {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }
}

impl Channel for LocalChannel {
    fn path(&self) -> &str {
        &self.path
    }

    fn emit(
        &self,
        event: &str,
        payload: Value,
        ack: Option<TransportAck>,
    ) -> Result<(), ChannelError> {
        let handlers: Vec<ChannelHandler> = self
            .handlers
            .read()
            .get(event)
            .cloned()
            .unwrap_or_default();

        let Some((first, rest)) = handlers.split_first() else {
            return Err(ChannelError::NoListener {
                path: self.path.clone(),
                event: event.to_string(),
            });
        };

        tracing::trace!(path = %self.path, event, receivers = handlers.len(), "local emit");
        for handler in rest {
            handler(payload.clone(), None);
        }
        first(payload, ack);
        Ok(())
    }

    fn on(&self, event: &str, handler: ChannelHandler) {
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }
}

impl fmt::Debug for LocalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalChannel")
            .field("path", &self.path)
            .field("events", &self.handlers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Opens [`LocalChannel`]s and counts how many it opened.
#[derive(Debug, Default)]
pub struct LocalChannelFactory {
    opened: AtomicUsize,
}

impl LocalChannelFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Channels opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ChannelFactory for LocalChannelFactory {
    fn open(&self, path: &str) -> Result<Arc<dyn Channel>, ChannelError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LocalChannel::new(path)))
    }
}
