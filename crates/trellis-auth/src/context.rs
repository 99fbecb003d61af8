//! Caller security context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Who is calling, as seen by the evaluator.
///
/// A context is built fresh for every evaluation request (typically from
/// the caller's session) and is never cached across requests.
///
/// # Wire Shape
///
/// User attributes are flattened next to `permissions`:
///
/// ```
/// use trellis_auth::SecurityContext;
/// use serde_json::json;
///
/// let ctx: SecurityContext = serde_json::from_value(json!({
///     "user": { "permissions": ["view_button1"], "location": "US" }
/// }))
/// .expect("context should parse");
///
/// assert!(ctx.user.has_permission("view_button1"));
/// assert_eq!(ctx.user.attribute("location"), Some(&json!("US")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    #[serde(default)]
    pub user: UserContext,
}

impl SecurityContext {
    /// A user with no permissions and no attributes.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_user(user: UserContext) -> Self {
        Self { user }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.user.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.user.attributes.insert(key.into(), value.into());
        self
    }
}

/// Permissions and free-form attributes of the calling user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
