//! Controller lifecycle states and transition outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one controller instance.
///
/// `Parsed → Installing → Installed → Activating → Activated`. A failed
/// install or activation leaves the instance `Redundant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        }
    }

    /// No further transition will happen from here.
    pub fn is_settled(&self) -> bool {
        matches!(self, LifecycleState::Activated | LifecycleState::Redundant)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful install step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub bucket: String,
    /// Number of shell resources written.
    pub seeded: usize,
    /// The new instance supersedes a running one without waiting for pages to close.
    pub skip_waiting: bool,
}

/// Result of a successful activate step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateOutcome {
    pub bucket: String,
    /// Stale buckets that were deleted.
    pub purged: Vec<String>,
    /// Open pages are controlled immediately instead of after a reload.
    pub clients_claimed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_states() {
        assert!(LifecycleState::Activated.is_settled());
        assert!(LifecycleState::Redundant.is_settled());
        assert!(!LifecycleState::Installed.is_settled());
        assert!(!LifecycleState::Parsed.is_settled());
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleState::Activating.to_string(), "activating");
    }
}
