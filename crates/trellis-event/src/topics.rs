//! Well-known topic names.

/// Emitted after a component finishes `init`.
pub const INIT: &str = "init";

/// Emitted after a component finishes `start`. Pending component handles
/// resolve on this topic.
pub const START: &str = "start";

/// Emitted after a component is destroyed.
pub const DESTROY: &str = "destroy";
