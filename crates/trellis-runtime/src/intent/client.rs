//! IntentClient - sends intents and waits for the server's ack.
//!
//! The channel is chosen by the intent's category: an explicit namespace
//! mapping if present, the default namespace otherwise. Default context
//! fields are merged under the intent's own fields.

use super::{server::INTENT_EVENT, ErrorPayload, IntentError};
use crate::channel::{ChannelRegistry, TransportAck};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use trellis_types::{Intent, IntentContext};

/// Namespace used when a category has no mapping.
pub const DEFAULT_NAMESPACE: &str = "/core";

type Reply = oneshot::Receiver<Result<(), IntentError>>;

/// Client side of intent routing.
#[derive(Debug, Clone)]
pub struct IntentClient {
    channels: Arc<ChannelRegistry>,
    namespaces: HashMap<String, String>,
    default_namespace: String,
    event: String,
    default_context: IntentContext,
    ack_timeout: Option<Duration>,
}

impl IntentClient {
    #[must_use]
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self {
            channels,
            namespaces: HashMap::new(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            event: INTENT_EVENT.to_string(),
            default_context: IntentContext::new(),
            ack_timeout: None,
        }
    }

    /// Sends intents of `category` on the channel at `path`.
    #[must_use]
    pub fn with_namespace(mut self, category: impl Into<String>, path: impl Into<String>) -> Self {
        self.namespaces.insert(category.into(), path.into());
        self
    }

    #[must_use]
    pub fn with_default_namespace(mut self, path: impl Into<String>) -> Self {
        self.default_namespace = path.into();
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Fields added to every intent that does not set them itself.
    #[must_use]
    pub fn with_default_context(mut self, context: IntentContext) -> Self {
        self.default_context = context;
        self
    }

    /// Upper bound applied by [`IntentClient::send`].
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Namespace path intents of `category` are sent on.
    #[must_use]
    pub fn namespace_for(&self, category: &str) -> &str {
        self.namespaces
            .get(category)
            .map_or(self.default_namespace.as_str(), String::as_str)
    }

    /// Sends `intent`, bounded by the configured ack timeout.
    ///
    /// The intent is transmitted before this method returns. The future
    /// resolves once the server acknowledges, or right after transmission
    /// when the intent does not require a reply.
    ///
    /// # Errors
    ///
    /// [`IntentError::Remote`] with the server's payload, a transport
    /// error, or [`IntentError::Timeout`].
    pub fn send(
        &self,
        intent: Intent,
    ) -> impl Future<Output = Result<(), IntentError>> + Send + 'static {
        self.send_timeout(intent, self.ack_timeout)
    }

    /// [`IntentClient::send`] with an explicit bound; `None` waits
    /// indefinitely.
    ///
    /// # Errors
    ///
    /// See [`IntentClient::send`].
    pub fn send_timeout(
        &self,
        intent: Intent,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), IntentError>> + Send + 'static {
        let key = intent.key();
        let transmitted = self.transmit(intent);
        async move {
            let Some(reply) = transmitted? else {
                return Ok(());
            };
            let settled = match timeout {
                None => reply.await,
                Some(after) => match tokio::time::timeout(after, reply).await {
                    Ok(settled) => settled,
                    Err(_) => {
                        tracing::warn!(intent = %key, ?after, "intent ack timed out");
                        return Err(IntentError::Timeout { key, after });
                    }
                },
            };
            settled.unwrap_or(Err(IntentError::AckDropped))
        }
    }

    fn transmit(&self, mut intent: Intent) -> Result<Option<Reply>, IntentError> {
        for (field, value) in &self.default_context {
            intent
                .context
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }

        let key = intent.key();
        let path = self.namespace_for(&intent.category).to_string();
        let channel = self.channels.get_channel(&path)?;
        let reply_required = intent.reply_required;
        let payload =
            serde_json::to_value(&intent).map_err(|e| IntentError::InvalidPayload(e.to_string()))?;

        if !reply_required {
            channel.emit(&self.event, payload, None)?;
            tracing::debug!(intent = %key, %path, "intent sent without reply");
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        let ack: TransportAck = Box::new(move |reply: Option<Value>| {
            let outcome = match ErrorPayload::from_reply(reply) {
                None => Ok(()),
                Some(payload) => Err(IntentError::Remote(payload)),
            };
            let _ = tx.send(outcome);
        });
        channel.emit(&self.event, payload, Some(ack))?;
        tracing::debug!(intent = %key, %path, "intent sent");
        Ok(Some(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use parking_lot::Mutex;
    use serde_json::json;

    fn capture(registry: &ChannelRegistry, path: &str) -> Arc<Mutex<Vec<Value>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.get_channel(path).expect("open").on(
            INTENT_EVENT,
            Arc::new(move |payload: Value, ack: Option<TransportAck>| {
                sink.lock().push(payload);
                if let Some(ack) = ack {
                    ack(None);
                }
            }),
        );
        seen
    }

    #[tokio::test]
    async fn default_context_fills_missing_fields_only() {
        let registry = Arc::new(ChannelRegistry::local());
        let seen = capture(&registry, "/core");
        let mut defaults = IntentContext::new();
        defaults.insert("locale".into(), json!("en"));
        defaults.insert("page".into(), json!("home"));
        let client = IntentClient::new(Arc::clone(&registry)).with_default_context(defaults);

        client
            .send(Intent::new("cart", "add").with_context("page", "checkout"))
            .await
            .expect("acked");

        let sent = seen.lock()[0].clone();
        assert_eq!(sent["context"]["locale"], "en");
        assert_eq!(sent["context"]["page"], "checkout");
    }

    #[tokio::test]
    async fn category_namespace_selects_channel() {
        let registry = Arc::new(ChannelRegistry::local());
        let core = capture(&registry, "/core");
        let admin = capture(&registry, "/admin");
        let client = IntentClient::new(Arc::clone(&registry)).with_namespace("users", "admin/");

        client.send(Intent::new("users", "ban")).await.expect("acked");
        client.send(Intent::new("cart", "add")).await.expect("acked");

        assert_eq!(admin.lock().len(), 1);
        assert_eq!(core.lock().len(), 1);
        assert_eq!(client.namespace_for("users"), "admin/");
    }

    #[tokio::test]
    async fn remote_error_rejects_with_payload() {
        let registry = Arc::new(ChannelRegistry::local());
        registry.get_channel("/core").expect("open").on(
            INTENT_EVENT,
            Arc::new(|_payload: Value, ack: Option<TransportAck>| {
                if let Some(ack) = ack {
                    ack(Some(json!({"code": "INTENT_UNAUTHORIZED", "message": "no"})));
                }
            }),
        );

        let err = IntentClient::new(registry)
            .send(Intent::new("cart", "add"))
            .await
            .expect_err("rejected");
        assert_eq!(
            err,
            IntentError::Remote(ErrorPayload::new("INTENT_UNAUTHORIZED", "no"))
        );
    }

    #[tokio::test]
    async fn fire_and_forget_resolves_without_ack() {
        let registry = Arc::new(ChannelRegistry::local());
        let acks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&acks);
        registry.get_channel("/core").expect("open").on(
            INTENT_EVENT,
            Arc::new(move |_payload: Value, ack: Option<TransportAck>| {
                sink.lock().push(ack.is_some());
            }),
        );

        IntentClient::new(registry)
            .send(Intent::new("stats", "ping").without_reply())
            .await
            .expect("sent");
        assert_eq!(*acks.lock(), vec![false]);
    }

    #[tokio::test]
    async fn missing_listener_is_a_transport_error() {
        let registry = Arc::new(ChannelRegistry::local());
        let err = IntentClient::new(registry)
            .send(Intent::new("cart", "add"))
            .await
            .expect_err("nobody listening");
        assert!(matches!(
            err,
            IntentError::Transport(ChannelError::NoListener { .. })
        ));
    }

    #[tokio::test]
    async fn dropped_transport_ack_is_reported() {
        let registry = Arc::new(ChannelRegistry::local());
        registry.get_channel("/core").expect("open").on(
            INTENT_EVENT,
            Arc::new(|_payload: Value, ack: Option<TransportAck>| drop(ack)),
        );
        let err = IntentClient::new(registry)
            .send(Intent::new("cart", "add"))
            .await
            .expect_err("dropped");
        assert_eq!(err, IntentError::AckDropped);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let registry = Arc::new(ChannelRegistry::local());
        let parked = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&parked);
        registry.get_channel("/core").expect("open").on(
            INTENT_EVENT,
            Arc::new(move |_payload: Value, ack: Option<TransportAck>| {
                sink.lock().extend(ack);
            }),
        );

        let err = IntentClient::new(registry)
            .with_ack_timeout(Some(Duration::from_millis(100)))
            .send(Intent::new("cart", "add"))
            .await
            .expect_err("times out");
        assert!(matches!(err, IntentError::Timeout { .. }));
        assert_eq!(parked.lock().len(), 1);
    }
}
