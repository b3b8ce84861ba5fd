//! Hook outcome type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a lifecycle hook disposed of an event it did not fail on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HookOutcome {
    /// Remote state was changed.
    Applied,
    /// Remote state already matched; nothing was sent.
    NoChange,
    /// The network is not managed by this driver (unsupported segment type,
    /// unmapped physical network).
    Unmanaged { reason: String },
    /// The port's workload does not run on a managed hypervisor.
    NotEligible { reason: String },
}

impl HookOutcome {
    /// Creates an unmanaged outcome.
    pub fn unmanaged(reason: impl Into<String>) -> Self {
        HookOutcome::Unmanaged {
            reason: reason.into(),
        }
    }

    /// Creates a not-eligible outcome.
    pub fn not_eligible(reason: impl Into<String>) -> Self {
        HookOutcome::NotEligible {
            reason: reason.into(),
        }
    }

    /// Returns true if remote state was changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, HookOutcome::Applied)
    }

    /// Returns true if the driver declined to act on the event.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            HookOutcome::Unmanaged { .. } | HookOutcome::NotEligible { .. }
        )
    }
}

impl fmt::Display for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutcome::Applied => write!(f, "applied"),
            HookOutcome::NoChange => write!(f, "no change"),
            HookOutcome::Unmanaged { reason } => write!(f, "unmanaged: {}", reason),
            HookOutcome::NotEligible { reason } => write!(f, "not eligible: {}", reason),
        }
    }
}
