//! Intent routing errors and their wire form.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`IntentError::HandlerNotFound`] | `INTENT_HANDLER_NOT_FOUND` | No |
//! | [`IntentError::Unauthorized`] | `INTENT_UNAUTHORIZED` | No |
//! | [`IntentError::EvaluatorFault`] | `INTENT_EVALUATOR_FAULT` | No |
//! | [`IntentError::RegistrationConflict`] | `INTENT_REGISTRATION_CONFLICT` | No |
//! | [`IntentError::Handler`] | `INTENT_HANDLER_FAILED` | No |
//! | [`IntentError::Dependency`] | `INTENT_DEPENDENCY_FAILED` | inherits |
//! | [`IntentError::Remote`] | `INTENT_REMOTE` | No |
//! | [`IntentError::Transport`] | `INTENT_TRANSPORT` | inherits |
//! | [`IntentError::AckDropped`] | `INTENT_ACK_DROPPED` | No |
//! | [`IntentError::InvalidPayload`] | `INTENT_INVALID_PAYLOAD` | No |
//! | [`IntentError::Timeout`] | `INTENT_TIMEOUT` | Yes |
//!
//! Errors reach the sender as an [`ErrorPayload`] through the ack. The
//! client turns a payload back into [`IntentError::Remote`].

use crate::channel::ChannelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use trellis_auth::{DenialReason, EvaluatorFault, Layer};
use trellis_component::ResolveError;
use trellis_types::{ErrorCode, IntentKey};

/// Error as carried across the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Interprets an ack argument: `None` or `null` means success.
    ///
    /// Anything that is not a `{code, message}` object is kept verbatim as
    /// the message of an `INTENT_REMOTE` payload.
    #[must_use]
    pub fn from_reply(reply: Option<Value>) -> Option<Self> {
        match reply {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value.clone())
                    .unwrap_or_else(|_| Self::new("INTENT_REMOTE", value.to_string())),
            ),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "code": self.code, "message": self.message })
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&IntentError> for ErrorPayload {
    fn from(err: &IntentError) -> Self {
        match err {
            IntentError::Remote(payload) => payload.clone(),
            other => Self::new(other.code(), other.to_string()),
        }
    }
}

/// Intent routing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error("no handler registered for '{key}'")]
    HandlerNotFound { key: IntentKey },

    #[error("'{key}' denied at {layer} layer: {reason}")]
    Unauthorized {
        key: IntentKey,
        layer: Layer,
        reason: DenialReason,
    },

    /// A dynamic condition failed; distinct from a denial.
    #[error("'{key}': {source}")]
    EvaluatorFault {
        key: IntentKey,
        #[source]
        source: EvaluatorFault,
    },

    #[error("a handler is already registered for '{key}'")]
    RegistrationConflict { key: IntentKey },

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("dependency unavailable: {0}")]
    Dependency(#[from] ResolveError),

    /// Error reported by the remote side.
    #[error("{0}")]
    Remote(ErrorPayload),

    #[error("transport: {0}")]
    Transport(#[from] ChannelError),

    #[error("handler dropped the ack without replying")]
    AckDropped,

    #[error("invalid intent payload: {0}")]
    InvalidPayload(String),

    #[error("no reply for '{key}' within {after:?}")]
    Timeout { key: IntentKey, after: Duration },
}

impl IntentError {
    /// Shorthand for [`IntentError::Handler`].
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Wire form of this error.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::from(self)
    }
}

impl ErrorCode for IntentError {
    fn code(&self) -> &'static str {
        match self {
            Self::HandlerNotFound { .. } => "INTENT_HANDLER_NOT_FOUND",
            Self::Unauthorized { .. } => "INTENT_UNAUTHORIZED",
            Self::EvaluatorFault { .. } => "INTENT_EVALUATOR_FAULT",
            Self::RegistrationConflict { .. } => "INTENT_REGISTRATION_CONFLICT",
            Self::Handler(_) => "INTENT_HANDLER_FAILED",
            Self::Dependency(_) => "INTENT_DEPENDENCY_FAILED",
            Self::Remote(_) => "INTENT_REMOTE",
            Self::Transport(_) => "INTENT_TRANSPORT",
            Self::AckDropped => "INTENT_ACK_DROPPED",
            Self::InvalidPayload(_) => "INTENT_INVALID_PAYLOAD",
            Self::Timeout { .. } => "INTENT_TIMEOUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Dependency(err) => err.is_recoverable(),
            Self::Transport(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_auth::ConditionError;
    use trellis_types::{assert_error_codes, Sid};

    fn key() -> IntentKey {
        IntentKey::new("cart", "add")
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                IntentError::HandlerNotFound { key: key() },
                IntentError::Unauthorized {
                    key: key(),
                    layer: Layer::Handler,
                    reason: DenialReason::MissingPermissions(vec!["buy".into()]),
                },
                IntentError::EvaluatorFault {
                    key: key(),
                    source: EvaluatorFault::new("geo", ConditionError::new("boom")),
                },
                IntentError::RegistrationConflict { key: key() },
                IntentError::handler("nope"),
                IntentError::Dependency(ResolveError::Timeout { sid: Sid::from("a") }),
                IntentError::Remote(ErrorPayload::new("X", "y")),
                IntentError::Transport(ChannelError::InvalidPath { path: " ".into() }),
                IntentError::AckDropped,
                IntentError::InvalidPayload("missing field".into()),
                IntentError::Timeout {
                    key: key(),
                    after: Duration::from_secs(1),
                },
            ],
            "INTENT_",
        );
    }

    #[test]
    fn payload_carries_code_and_message() {
        let err = IntentError::HandlerNotFound { key: key() };
        let payload = err.to_payload();
        assert_eq!(payload.code, "INTENT_HANDLER_NOT_FOUND");
        assert_eq!(payload.message, "no handler registered for 'cart.add'");
    }

    #[test]
    fn remote_payload_passes_through() {
        let original = ErrorPayload::new("INTENT_UNAUTHORIZED", "denied");
        let err = IntentError::Remote(original.clone());
        assert_eq!(err.to_payload(), original);
    }

    #[test]
    fn reply_interpretation() {
        assert_eq!(ErrorPayload::from_reply(None), None);
        assert_eq!(ErrorPayload::from_reply(Some(Value::Null)), None);

        let structured = ErrorPayload::from_reply(Some(json!({"code": "A", "message": "b"})));
        assert_eq!(structured, Some(ErrorPayload::new("A", "b")));

        let opaque = ErrorPayload::from_reply(Some(json!("kaput"))).expect("error");
        assert_eq!(opaque.code, "INTENT_REMOTE");
        assert_eq!(opaque.message, "\"kaput\"");
    }
}
