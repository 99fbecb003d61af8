//! Unified error interface.
//!
//! Every Trellis error type implements [`ErrorCode`] so that errors can be
//! reported across the transport boundary as stable machine-readable codes.
//!
//! | Crate | Prefix |
//! |-------|--------|
//! | trellis-auth | `AUTH_` |
//! | trellis-component | `LIFECYCLE_`, `RESOLVE_` |
//! | trellis-runtime | `INTENT_`, `CHANNEL_`, `CONFIG_` |

/// Machine-readable error classification.
///
/// # Example
///
/// ```
/// use trellis_types::ErrorCode;
///
/// enum LookupError {
///     Missing,
///     Busy,
/// }
///
/// impl ErrorCode for LookupError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Missing => "LOOKUP_MISSING",
///             Self::Busy => "LOOKUP_BUSY",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         matches!(self, Self::Busy)
///     }
/// }
///
/// assert_eq!(LookupError::Busy.code(), "LOOKUP_BUSY");
/// assert!(!LookupError::Missing.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Stable UPPER_SNAKE_CASE code, prefixed with the owning domain.
    fn code(&self) -> &'static str;

    /// `true` when retrying (or waiting) may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that `err` carries a well-formed code with the given prefix.
///
/// Intended for tests.
///
/// # Panics
///
/// Panics if the code is empty, lacks the prefix, or is not UPPER_SNAKE_CASE.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Runs [`assert_error_code`] over every variant in `errors`.
///
/// # Panics
///
/// Panics on the first malformed code.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    errors
        .iter()
        .for_each(|err| assert_error_code(err, expected_prefix));
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
