//! Intent domain types.
//!
//! An [`Intent`] is a named, categorized action request sent by a client to
//! the component that owns it. `category` names the owning component and
//! `action` names the operation; together they form the [`IntentKey`]
//! that selects exactly one server-side handler.
//!
//! # Wire Shape
//!
//! ```text
//! { "category": "cart", "action": "add", "context": { "sku": "A-1" } }
//! ```
//!
//! `reply_required` is optional on the wire and defaults to `true`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form intent arguments.
pub type IntentContext = Map<String, Value>;

/// A categorized action request.
///
/// Intents are immutable once sent: the client consumes the value in
/// `send`, the server only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Owning component (e.g. "cart").
    pub category: String,
    /// Operation within the category (e.g. "add").
    pub action: String,
    /// Arguments.
    #[serde(default)]
    pub context: IntentContext,
    /// Whether the sender waits for an acknowledgment.
    #[serde(default = "reply_required_default")]
    pub reply_required: bool,
}

fn reply_required_default() -> bool {
    true
}

impl Intent {
    /// Creates an intent with an empty context that expects a reply.
    #[must_use]
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            context: IntentContext::new(),
            reply_required: true,
        }
    }

    /// Adds one context field.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Marks the intent as fire-and-forget.
    #[must_use]
    pub fn without_reply(mut self) -> Self {
        self.reply_required = false;
        self
    }

    /// Returns the routing key.
    #[must_use]
    pub fn key(&self) -> IntentKey {
        IntentKey::new(&self.category, &self.action)
    }
}

/// Fully-qualified `(category, action)` pair.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntentKey {
    pub category: String,
    pub action: String,
}

impl IntentKey {
    #[must_use]
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_without_reply_flag_defaults_to_reply() {
        let intent: Intent = serde_json::from_value(json!({
            "category": "cart",
            "action": "add",
            "context": {"sku": "A-1"}
        }))
        .expect("wire intent should parse");

        assert_eq!(intent.category, "cart");
        assert_eq!(intent.action, "add");
        assert_eq!(intent.context.get("sku"), Some(&json!("A-1")));
        assert!(intent.reply_required);
    }

    #[test]
    fn missing_context_is_empty() {
        let intent: Intent = serde_json::from_value(json!({"category": "a", "action": "b"}))
            .expect("intent without context should parse");
        assert!(intent.context.is_empty());
    }

    #[test]
    fn builder_sets_fields() {
        let intent = Intent::new("menu", "toggle")
            .with_context("open", true)
            .without_reply();
        assert_eq!(intent.context.get("open"), Some(&json!(true)));
        assert!(!intent.reply_required);
    }

    #[test]
    fn key_display() {
        assert_eq!(IntentKey::new("menu", "toggle").to_string(), "menu.toggle");
    }
}
