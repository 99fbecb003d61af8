//! Per-connection session shared by every intent on that connection.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use trellis_auth::{SecurityContext, UserContext};

/// Session contents: the authenticated user plus free-form handler fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Shared, mutable session. Clones refer to the same session.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionData>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session already carrying `user`.
    #[must_use]
    pub fn for_user(user: UserContext) -> Self {
        let session = Self::new();
        session.set_user(Some(user));
        session
    }

    #[must_use]
    pub fn user(&self) -> Option<UserContext> {
        self.inner.lock().user.clone()
    }

    pub fn set_user(&self, user: Option<UserContext>) {
        self.inner.lock().user = user;
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner.lock().fields.get(field).cloned()
    }

    pub fn insert(&self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.lock().fields.insert(field.into(), value.into())
    }

    pub fn remove(&self, field: &str) -> Option<Value> {
        self.inner.lock().fields.remove(field)
    }

    /// Runs `f` with exclusive access to the session.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().clone()
    }

    /// Security context derived from the current user, built anew on each
    /// call. No user means an anonymous context.
    #[must_use]
    pub fn security_context(&self) -> SecurityContext {
        self.user()
            .map_or_else(SecurityContext::anonymous, SecurityContext::for_user)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle")
            .field(&*self.inner.lock())
            .finish()
    }
}
