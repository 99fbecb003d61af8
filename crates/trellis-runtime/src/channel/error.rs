//! Channel layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ChannelError::InvalidPath`] | `CHANNEL_INVALID_PATH` | No |
//! | [`ChannelError::NoListener`] | `CHANNEL_NO_LISTENER` | Yes |
//! | [`ChannelError::Factory`] | `CHANNEL_FACTORY_FAILED` | Yes |
//!
//! # Example
//!
//! ```
//! use trellis_runtime::channel::ChannelError;
//! use trellis_types::ErrorCode;
//!
//! let err = ChannelError::NoListener {
//!     path: "/core".into(),
//!     event: "request_intent".into(),
//! };
//! assert_eq!(err.code(), "CHANNEL_NO_LISTENER");
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;
use trellis_types::ErrorCode;

/// Channel layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The path cannot name a channel (embedded whitespace or control characters).
    #[error("invalid channel path: {path:?}")]
    InvalidPath { path: String },

    /// Nothing is listening for `event` on the channel.
    #[error("no listener for '{event}' on {path}")]
    NoListener { path: String, event: String },

    /// The transport could not open a channel for `path`.
    #[error("cannot open channel {path}: {message}")]
    Factory { path: String, message: String },
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "CHANNEL_INVALID_PATH",
            Self::NoListener { .. } => "CHANNEL_NO_LISTENER",
            Self::Factory { .. } => "CHANNEL_FACTORY_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidPath { .. })
    }
}
