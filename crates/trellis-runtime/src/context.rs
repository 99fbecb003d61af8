//! RuntimeContext - wires configuration into the routing pieces.
//!
//! ```text
//! TrellisConfig ──► RuntimeContext
//!                     ├─ ChannelRegistry   (one channel per path)
//!                     ├─ IntentRouter      (component guards from [access])
//!                     ├─ client()  ──► IntentClient  (namespaces, timeouts)
//!                     └─ server()  ──► IntentServer  (intent event)
//! ```

use crate::channel::{ChannelError, ChannelFactory, ChannelRegistry};
use crate::config::TrellisConfig;
use crate::intent::{IntentClient, IntentRouter, IntentServer, SessionHandle};
use std::sync::Arc;
use std::time::Duration;
use trellis_auth::ComponentAccess;

/// Shared state for one process: config, channels and the route table.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    config: Arc<TrellisConfig>,
    channels: Arc<ChannelRegistry>,
    router: Arc<IntentRouter>,
}

impl RuntimeContext {
    /// Uses in-process loopback channels.
    #[must_use]
    pub fn new(config: TrellisConfig) -> Self {
        Self::with_registry(config, ChannelRegistry::local())
    }

    #[must_use]
    pub fn with_factory(config: TrellisConfig, factory: Arc<dyn ChannelFactory>) -> Self {
        Self::with_registry(config, ChannelRegistry::new(factory))
    }

    fn with_registry(config: TrellisConfig, channels: ChannelRegistry) -> Self {
        let router = IntentRouter::new();
        for (component, access) in &config.access {
            tracing::debug!(
                component = %component,
                permissions = access.permissions.len(),
                conditions = access.conditions.len(),
                "component guarded"
            );
            router.guard_component(component.clone(), access.to_access().requirement());
        }
        Self {
            config: Arc::new(config),
            channels: Arc::new(channels),
            router: Arc::new(router),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    #[must_use]
    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    #[must_use]
    pub fn router(&self) -> &Arc<IntentRouter> {
        &self.router
    }

    /// Declared access rules for `component`, if configured.
    #[must_use]
    pub fn access(&self, component: &str) -> Option<ComponentAccess> {
        self.config.access.get(component).map(|a| a.to_access())
    }

    /// Bound for dependency waits.
    #[must_use]
    pub fn resolver_timeout(&self) -> Option<Duration> {
        self.config.resolver.wait_timeout()
    }

    /// A client sending over this context's channels.
    #[must_use]
    pub fn client(&self) -> IntentClient {
        let transport = &self.config.transport;
        transport.namespaces.iter().fold(
            IntentClient::new(Arc::clone(&self.channels))
                .with_default_namespace(transport.default_namespace.clone())
                .with_event(transport.intent_event.clone())
                .with_default_context(self.config.client.default_context.clone())
                .with_ack_timeout(self.config.client.ack_timeout()),
            |client, (category, path)| client.with_namespace(category.clone(), path.clone()),
        )
    }

    #[must_use]
    pub fn server(&self) -> IntentServer {
        IntentServer::new(Arc::clone(&self.router))
            .with_event(self.config.transport.intent_event.clone())
    }

    /// Serves intents arriving on the channel at `path` for one connection.
    ///
    /// # Errors
    ///
    /// [`ChannelError`] if the channel cannot be opened.
    pub fn bind(&self, path: &str, session: SessionHandle) -> Result<(), ChannelError> {
        let channel = self.channels.get_channel(path)?;
        self.server().bind(channel.as_ref(), session);
        Ok(())
    }
}
