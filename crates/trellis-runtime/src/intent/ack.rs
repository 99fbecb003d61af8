//! Ack - the single completion callback handed to an intent handler.
//!
//! The first call wins. Later calls are ignored with a warning. If every
//! clone of an ack is dropped without a call, the sender is answered with
//! [`IntentError::AckDropped`] so it never waits forever.

use super::IntentError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use trellis_types::IntentKey;

type Reply = Box<dyn FnOnce(Result<(), IntentError>) + Send>;

struct AckInner {
    key: IntentKey,
    reply: Mutex<Option<Reply>>,
}

impl Drop for AckInner {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.get_mut().take() {
            tracing::warn!(intent = %self.key, "ack dropped without a reply");
            reply(Err(IntentError::AckDropped));
        }
    }
}

/// Idempotent reply handle. Clones share the same reply.
#[derive(Clone)]
pub struct Ack {
    inner: Arc<AckInner>,
}

impl Ack {
    pub fn new<F>(key: IntentKey, reply: F) -> Self
    where
        F: FnOnce(Result<(), IntentError>) + Send + 'static,
    {
        Self {
            inner: Arc::new(AckInner {
                key,
                reply: Mutex::new(Some(Box::new(reply))),
            }),
        }
    }

    /// An ack whose reply goes nowhere, for fire-and-forget intents.
    #[must_use]
    pub fn detached(key: IntentKey) -> Self {
        Self::new(key, |_| {})
    }

    #[must_use]
    pub fn key(&self) -> &IntentKey {
        &self.inner.key
    }

    /// Acknowledges success. Returns `false` if already acknowledged.
    pub fn ok(&self) -> bool {
        self.send(Ok(()))
    }

    /// Acknowledges failure. Returns `false` if already acknowledged.
    pub fn err(&self, err: IntentError) -> bool {
        self.send(Err(err))
    }

    /// Sends `outcome` unless a reply was already sent.
    pub fn send(&self, outcome: Result<(), IntentError>) -> bool {
        let Some(reply) = self.inner.reply.lock().take() else {
            tracing::warn!(intent = %self.inner.key, "ack already sent; ignoring repeat");
            return false;
        };
        reply(outcome);
        true
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.inner.reply.lock().is_none()
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack")
            .field("key", &self.inner.key)
            .field("sent", &self.is_sent())
            .finish()
    }
}
