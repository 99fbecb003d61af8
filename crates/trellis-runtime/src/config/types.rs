//! Configuration types.
//!
//! Every section implements [`Default`]; fields missing from a file keep
//! their defaults.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "compact"
//!
//! [transport]
//! default_namespace = "/core"
//! intent_event = "request_intent"
//! namespaces = { admin = "/admin" }
//!
//! [client]
//! ack_timeout_ms = 5000
//! default_context = { locale = "en" }
//!
//! [resolver]
//! wait_timeout_ms = 2000
//!
//! [access.buttons]
//! permissions = ["view_button1"]
//! conditions = [
//!     { attribute = "location", equals = "US" },
//!     { view = "checkout", attribute = "verified", equals = true },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use trellis_auth::{
    ComponentAccess, ConditionModule, ConditionScope, DynamicCondition, SecurityContext,
};

/// Unified configuration after every layer is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub logging: LoggingConfig,
    pub transport: TransportConfig,
    pub client: ClientConfig,
    pub resolver: ResolverConfig,
    /// Declared access rules, keyed by component (intent category) name.
    pub access: BTreeMap<String, AccessConfig>,
}

impl TrellisConfig {
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Overlays `other` on `self`. Only values that differ from the
    /// defaults override; access entries are replaced per component.
    ///
    /// # Limitations
    ///
    /// A later layer cannot reset a field to its default: `level = "info"`
    /// or `default_namespace = "/core"` in an overlay is indistinguishable
    /// from an omitted key and leaves the earlier value in place. Likewise
    /// an unset `ack_timeout_ms` or `wait_timeout_ms` never clears a bound
    /// set by an earlier layer. Map entries (`namespaces`,
    /// `default_context`) are only ever added or replaced, never removed.
    pub fn merge(&mut self, other: &Self) {
        self.logging.merge(&other.logging);
        self.transport.merge(&other.transport);
        self.client.merge(&other.client);
        self.resolver.merge(&other.resolver);
        for (component, access) in &other.access {
            self.access.insert(component.clone(), access.clone());
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

impl LogFormat {
    /// Parses `full` or `compact`, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Full,
        }
    }
}

impl LoggingConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();
        if other.level != default.level {
            self.level = other.level.clone();
        }
        if other.format != default.format {
            self.format = other.format;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Channel used by categories without a namespace entry.
    pub default_namespace: String,
    /// Event intents are emitted as.
    pub intent_event: String,
    /// Category → channel path.
    pub namespaces: BTreeMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            default_namespace: "/core".into(),
            intent_event: "request_intent".into(),
            namespaces: BTreeMap::new(),
        }
    }
}

impl TransportConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();
        if other.default_namespace != default.default_namespace {
            self.default_namespace = other.default_namespace.clone();
        }
        if other.intent_event != default.intent_event {
            self.intent_event = other.intent_event.clone();
        }
        self.namespaces.extend(
            other
                .namespaces
                .iter()
                .map(|(category, path)| (category.clone(), path.clone())),
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Fields merged under every sent intent's context.
    pub default_context: Map<String, Value>,
    /// Bound on waiting for an ack. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_timeout_ms: Option<u64>,
}

impl ClientConfig {
    #[must_use]
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }

    fn merge(&mut self, other: &Self) {
        for (field, value) in &other.default_context {
            self.default_context.insert(field.clone(), value.clone());
        }
        if other.ack_timeout_ms.is_some() {
            self.ack_timeout_ms = other.ack_timeout_ms;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Default bound for component waits. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout_ms: Option<u64>,
}

impl ResolverConfig {
    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }

    fn merge(&mut self, other: &Self) {
        if other.wait_timeout_ms.is_some() {
            self.wait_timeout_ms = other.wait_timeout_ms;
        }
    }
}

/// A component's declared access rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub permissions: Vec<String>,
    pub conditions: Vec<ConditionConfig>,
}

/// Declarative predicate: `user.attributes[attribute] == equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// View the condition applies to; the whole component when absent or `*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    pub attribute: String,
    pub equals: Value,
}

impl AccessConfig {
    /// Builds the evaluator inputs for this component.
    ///
    /// Several conditions on the same scope are combined into one that
    /// requires all of them, checked in declaration order.
    #[must_use]
    pub fn to_access(&self) -> ComponentAccess {
        let mut grouped: BTreeMap<Option<&str>, Vec<DynamicCondition>> = BTreeMap::new();
        for condition in &self.conditions {
            let view = condition
                .view
                .as_deref()
                .filter(|v| *v != ConditionScope::COMPONENT_KEY);
            grouped
                .entry(view)
                .or_default()
                .push(DynamicCondition::attribute_equals(
                    condition.attribute.clone(),
                    condition.equals.clone(),
                ));
        }

        let mut module = ConditionModule::new();
        for (view, conditions) in grouped {
            let scope = view.map_or(ConditionScope::Component, ConditionScope::parse);
            module.insert(scope, all_of(conditions));
        }

        self.permissions
            .iter()
            .fold(ComponentAccess::new(), |access, permission| {
                access.with_permission(permission.clone())
            })
            .with_conditions(module)
    }
}

fn all_of(mut conditions: Vec<DynamicCondition>) -> DynamicCondition {
    if conditions.len() == 1 {
        if let Some(only) = conditions.pop() {
            return only;
        }
    }
    let name = conditions
        .iter()
        .map(DynamicCondition::name)
        .collect::<Vec<_>>()
        .join(" && ");
    DynamicCondition::new(name, move |ctx: &SecurityContext| {
        for condition in &conditions {
            if !condition.evaluate(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}
