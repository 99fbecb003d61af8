//! Identifier types for components.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Identity of one component instance.
///
/// A component is described by its `name` and `version` (what it is) and an
/// `instance` UUID (which live copy it is). Two instances of the same
/// component compare unequal; use [`same_component`](Self::same_component)
/// to compare by name and version only.
///
/// # Example
///
/// ```
/// use trellis_types::ComponentId;
///
/// let a = ComponentId::new("cart", "2.0.1");
/// let b = ComponentId::new("cart", "2.0.1");
/// assert_ne!(a, b);
/// assert!(a.same_component(&b));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    /// Component name (e.g. "header", "cart").
    pub name: String,
    /// Declared component version.
    pub version: String,
    /// Per-instance identifier (UUID v4).
    pub instance: Uuid,
}

impl ComponentId {
    /// Creates an identity for a fresh instance with a random UUID v4.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instance: Uuid::new_v4(),
        }
    }

    /// Returns `name@version`.
    #[must_use]
    pub fn fqn(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Compares name and version, ignoring the instance UUID.
    #[must_use]
    pub fn same_component(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.name, self.version, self.instance)
    }
}

/// Static id of a child component, unique within its parent's scope.
///
/// Sids are how a parent names the children it depends on. They are plain
/// strings and compare case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(String);

impl Sid {
    #[must_use]
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Sid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Sid> for Sid {
    fn from(s: &Sid) -> Self {
        s.clone()
    }
}

impl Borrow<str> for Sid {
    fn borrow(&self) -> &str {
        &self.0
    }
}
