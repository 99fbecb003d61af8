//! IntentServer - binds an [`IntentRouter`] to a channel.
//!
//! ```text
//! channel "request_intent" (payload, transport ack)
//!   │
//!   ├─ decode Intent ───── bad payload ──► transport ack({code, message})
//!   ├─ session.security_context()          fresh per intent
//!   └─ spawn router.dispatch(...)          Ack ──► transport ack(null | {code, message})
//! ```

use super::{Ack, DispatchOutcome, IntentError, IntentRouter, SessionHandle};
use crate::channel::{Channel, TransportAck};
use serde_json::Value;
use std::sync::Arc;
use trellis_types::{ErrorCode, Intent, IntentKey};

/// Default event intents travel on.
pub const INTENT_EVENT: &str = "request_intent";

/// Receives intents from channels and hands them to the router.
#[derive(Debug, Clone)]
pub struct IntentServer {
    router: Arc<IntentRouter>,
    event: String,
}

impl IntentServer {
    #[must_use]
    pub fn new(router: Arc<IntentRouter>) -> Self {
        Self {
            router,
            event: INTENT_EVENT.to_string(),
        }
    }

    /// Listens on `event` instead of [`INTENT_EVENT`].
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    #[must_use]
    pub fn router(&self) -> &Arc<IntentRouter> {
        &self.router
    }

    /// Serves intents arriving on `channel` for the connection owning
    /// `session`.
    ///
    /// Dispatch runs on the ambient tokio runtime. Without one, every intent
    /// is answered with an `INTENT_HANDLER_FAILED` error.
    pub fn bind(&self, channel: &dyn Channel, session: SessionHandle) {
        let server = self.clone();
        tracing::debug!(path = channel.path(), event = %self.event, "intent server bound");
        channel.on(
            &self.event,
            Arc::new(move |payload: Value, reply: Option<TransportAck>| {
                server.receive(payload, session.clone(), reply);
            }),
        );
    }

    fn receive(&self, payload: Value, session: SessionHandle, reply: Option<TransportAck>) {
        let intent: Intent = match serde_json::from_value(payload) {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable intent payload");
                if let Some(reply) = reply {
                    let payload = IntentError::InvalidPayload(err.to_string()).to_payload();
                    reply(Some(payload.to_value()));
                }
                return;
            }
        };

        let ack = wire_ack(intent.key(), reply);
        let ctx = session.security_context();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::error!(intent = %intent.key(), "no async runtime to dispatch on");
                ack.err(IntentError::handler("no async runtime available"));
                return;
            }
        };

        let router = Arc::clone(&self.router);
        runtime.spawn(async move {
            let key = intent.key();
            let outcome = router.dispatch(intent, &ctx, session, ack).await;
            if outcome != DispatchOutcome::Invoked {
                tracing::debug!(intent = %key, ?outcome, "intent not handled");
            }
        });
    }
}

/// An [`Ack`] answering through the transport ack, if the sender gave one.
fn wire_ack(key: IntentKey, reply: Option<TransportAck>) -> Ack {
    match reply {
        None => Ack::detached(key),
        Some(reply) => Ack::new(key, move |outcome| {
            let value = match outcome {
                Ok(()) => None,
                Err(err) => {
                    tracing::debug!(code = err.code(), error = %err, "replying with error");
                    Some(err.to_payload().to_value())
                }
            };
            reply(value);
        }),
    }
}
