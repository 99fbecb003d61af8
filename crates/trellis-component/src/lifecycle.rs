//! Lifecycle states.
//!
//! ```text
//! Created ──► Initialized ──► Started
//!    │             │             │
//!    └─────────────┴─────────────┴──► Destroyed
//! ```
//!
//! Only the `Started` transition fulfils pending component handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a component instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Created,
    Initialized,
    Started,
    Destroyed,
}

impl LifecycleState {
    /// Returns `true` if `self → to` is a legal transition.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_component::LifecycleState;
    ///
    /// assert!(LifecycleState::Created.can_transition_to(LifecycleState::Initialized));
    /// assert!(!LifecycleState::Created.can_transition_to(LifecycleState::Started));
    /// assert!(LifecycleState::Started.can_transition_to(LifecycleState::Destroyed));
    /// assert!(!LifecycleState::Destroyed.can_transition_to(LifecycleState::Destroyed));
    /// ```
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Initialized)
                | (Self::Initialized, Self::Started)
                | (Self::Created | Self::Initialized | Self::Started, Self::Destroyed)
        )
    }

    #[must_use]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    #[must_use]
    pub fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LifecycleState; 4] = [
        LifecycleState::Created,
        LifecycleState::Initialized,
        LifecycleState::Started,
        LifecycleState::Destroyed,
    ];

    #[test]
    fn only_forward_transitions() {
        let legal: Vec<(LifecycleState, LifecycleState)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            legal,
            vec![
                (LifecycleState::Created, LifecycleState::Initialized),
                (LifecycleState::Created, LifecycleState::Destroyed),
                (LifecycleState::Initialized, LifecycleState::Started),
                (LifecycleState::Initialized, LifecycleState::Destroyed),
                (LifecycleState::Started, LifecycleState::Destroyed),
            ]
        );
    }

    #[test]
    fn default_is_created() {
        assert_eq!(LifecycleState::default(), LifecycleState::Created);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(LifecycleState::Initialized.to_string(), "initialized");
    }
}
