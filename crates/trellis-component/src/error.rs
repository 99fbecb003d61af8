//! Component layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ComponentError::Failed`] | `LIFECYCLE_COMPONENT_FAILED` | No |
//! | [`LifecycleError::InvalidTransition`] | `LIFECYCLE_INVALID_TRANSITION` | No |
//! | [`LifecycleError::Hook`] | `LIFECYCLE_HOOK_FAILED` | Yes |
//! | [`LifecycleError::MissingSid`] | `LIFECYCLE_MISSING_SID` | No |
//! | [`LifecycleError::ScopeClosed`] | `LIFECYCLE_SCOPE_CLOSED` | No |
//! | [`ResolveError::ScopeClosed`] | `RESOLVE_SCOPE_CLOSED` | No |
//! | [`ResolveError::Abandoned`] | `RESOLVE_ABANDONED` | No |
//! | [`ResolveError::Timeout`] | `RESOLVE_TIMEOUT` | Yes |
//! | [`ResolveError::AggregateTimeout`] | `RESOLVE_AGGREGATE_TIMEOUT` | Yes |
//! | [`ResolveError::AggregateRejected`] | `RESOLVE_AGGREGATE_REJECTED` | inherits |
//!
//! A handle that never resolves is not an error: it simply stays pending.

use crate::LifecycleState;
use thiserror::Error;
use trellis_types::{ErrorCode, Sid};

/// Error returned by a component's own lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("{0}")]
    Failed(String),
}

impl ComponentError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "LIFECYCLE_COMPONENT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Lifecycle transition or child management failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{component}: cannot go from {from} to {to}")]
    InvalidTransition {
        component: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// A hook failed; the component stays in its previous state.
    #[error("{component}: {hook} hook failed: {source}")]
    Hook {
        component: String,
        hook: &'static str,
        #[source]
        source: ComponentError,
    },

    #[error("{component}: a child must carry a sid to be attached")]
    MissingSid { component: String },

    #[error("{owner}: child scope is closed")]
    ScopeClosed { owner: String },
}

impl ErrorCode for LifecycleError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "LIFECYCLE_INVALID_TRANSITION",
            Self::Hook { .. } => "LIFECYCLE_HOOK_FAILED",
            Self::MissingSid { .. } => "LIFECYCLE_MISSING_SID",
            Self::ScopeClosed { .. } => "LIFECYCLE_SCOPE_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Hook { .. })
    }
}

/// A component handle (or an aggregate of handles) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The parent scope was torn down before the child started.
    #[error("scope closed before '{sid}' started")]
    ScopeClosed { sid: Sid },

    /// Every reference to a pending handle was dropped.
    #[error("handle for '{sid}' was abandoned")]
    Abandoned { sid: Sid },

    /// A caller-supplied timeout elapsed.
    #[error("timed out waiting for '{sid}'")]
    Timeout { sid: Sid },

    /// A caller-supplied timeout elapsed on an aggregate.
    #[error("timed out waiting for [{}]", join(pending))]
    AggregateTimeout { pending: Vec<Sid> },

    /// One member of an aggregate was rejected.
    #[error("aggregate rejected by '{sid}': {source}")]
    AggregateRejected {
        sid: Sid,
        #[source]
        source: Box<ResolveError>,
    },
}

fn join(sids: &[Sid]) -> String {
    sids.iter()
        .map(Sid::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ErrorCode for ResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::ScopeClosed { .. } => "RESOLVE_SCOPE_CLOSED",
            Self::Abandoned { .. } => "RESOLVE_ABANDONED",
            Self::Timeout { .. } => "RESOLVE_TIMEOUT",
            Self::AggregateTimeout { .. } => "RESOLVE_AGGREGATE_TIMEOUT",
            Self::AggregateRejected { .. } => "RESOLVE_AGGREGATE_REJECTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::AggregateTimeout { .. } => true,
            Self::AggregateRejected { source, .. } => source.is_recoverable(),
            Self::ScopeClosed { .. } | Self::Abandoned { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::assert_error_codes;

    #[test]
    fn lifecycle_codes_valid() {
        assert_error_codes(
            &[
                LifecycleError::InvalidTransition {
                    component: "x".into(),
                    from: LifecycleState::Created,
                    to: LifecycleState::Started,
                },
                LifecycleError::Hook {
                    component: "x".into(),
                    hook: "start",
                    source: ComponentError::failed("boom"),
                },
                LifecycleError::MissingSid {
                    component: "x".into(),
                },
                LifecycleError::ScopeClosed { owner: "x".into() },
            ],
            "LIFECYCLE_",
        );
        assert_error_codes(&[ComponentError::failed("x")], "LIFECYCLE_");
    }

    #[test]
    fn resolve_codes_valid() {
        let sid = Sid::from("a");
        assert_error_codes(
            &[
                ResolveError::ScopeClosed { sid: sid.clone() },
                ResolveError::Abandoned { sid: sid.clone() },
                ResolveError::Timeout { sid: sid.clone() },
                ResolveError::AggregateTimeout {
                    pending: vec![sid.clone()],
                },
                ResolveError::AggregateRejected {
                    sid: sid.clone(),
                    source: Box::new(ResolveError::ScopeClosed { sid }),
                },
            ],
            "RESOLVE_",
        );
    }

    #[test]
    fn aggregate_recoverability_follows_member() {
        let timeout = ResolveError::AggregateRejected {
            sid: Sid::from("a"),
            source: Box::new(ResolveError::Timeout { sid: Sid::from("a") }),
        };
        assert!(timeout.is_recoverable());

        let closed = ResolveError::AggregateRejected {
            sid: Sid::from("a"),
            source: Box::new(ResolveError::ScopeClosed { sid: Sid::from("a") }),
        };
        assert!(!closed.is_recoverable());
    }

    #[test]
    fn aggregate_timeout_lists_pending() {
        let err = ResolveError::AggregateTimeout {
            pending: vec![Sid::from("a"), Sid::from("b")],
        };
        assert_eq!(err.to_string(), "timed out waiting for [a, b]");
    }
}
