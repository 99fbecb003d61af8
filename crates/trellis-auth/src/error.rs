//! Authorization errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`AuthError::Unauthorized`] | `AUTH_UNAUTHORIZED` | No |
//! | [`AuthError::Fault`] | `AUTH_EVALUATOR_FAULT` | No |
//!
//! A predicate that fails is reported as a fault with its own code, never
//! as a denial.

use crate::{ConditionError, DenialReason, Layer};
use thiserror::Error;
use trellis_types::ErrorCode;

/// A dynamic condition failed instead of returning a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dynamic condition '{condition}' faulted: {source}")]
pub struct EvaluatorFault {
    /// Name of the faulting condition.
    pub condition: String,
    #[source]
    pub source: ConditionError,
}

impl EvaluatorFault {
    #[must_use]
    pub fn new(condition: impl Into<String>, source: ConditionError) -> Self {
        Self {
            condition: condition.into(),
            source,
        }
    }
}

impl ErrorCode for EvaluatorFault {
    fn code(&self) -> &'static str {
        "AUTH_EVALUATOR_FAULT"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Outcome of a failed authorization, for callers that want a `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The evaluator returned `false` at `layer`.
    #[error("{layer} authorization denied: {reason}")]
    Unauthorized { layer: Layer, reason: DenialReason },

    /// The evaluator could not decide.
    #[error(transparent)]
    Fault(#[from] EvaluatorFault),
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "AUTH_UNAUTHORIZED",
            Self::Fault(fault) => fault.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::assert_error_codes;

    fn all_variants() -> Vec<AuthError> {
        vec![
            AuthError::Unauthorized {
                layer: Layer::Handler,
                reason: DenialReason::MissingPermissions(vec!["x".into()]),
            },
            AuthError::Fault(EvaluatorFault::new("c", ConditionError::new("boom"))),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "AUTH_");
    }

    #[test]
    fn fault_is_not_unauthorized() {
        let err = AuthError::from(EvaluatorFault::new("geo", ConditionError::new("lookup failed")));
        assert_eq!(err.code(), "AUTH_EVALUATOR_FAULT");
        let msg = err.to_string();
        assert!(msg.contains("geo"), "got: {msg}");
        assert!(msg.contains("lookup failed"), "got: {msg}");
    }

    #[test]
    fn unauthorized_display_names_layer() {
        let err = AuthError::Unauthorized {
            layer: Layer::Component,
            reason: DenialReason::ConditionFailed {
                condition: "in_us".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("component authorization denied"), "got: {msg}");
        assert!(msg.contains("in_us"), "got: {msg}");
    }
}
