//! # Compliance State Lattice
//!
//! Verdicts of individual rules are combined pessimistically:
//!
//! ```text
//! Ordering (worst → best): NonCompliant < Pending < NotApplicable < Exempt < Compliant
//!
//! meet(a, b) = min(a, b)
//! ```
//!
//! `NonCompliant` is absorbing under `meet`. A gate allows an operation
//! only when the combined state is passing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict of one rule, or of a whole rulebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceState {
    /// The operation satisfies the rule.
    Compliant,
    /// The operation violates the rule.
    NonCompliant,
    /// The rule cannot decide yet (missing data).
    Pending,
    /// The operation is exempt from the rule.
    Exempt,
    /// The rule does not concern this operation.
    NotApplicable,
}

impl ComplianceState {
    fn ordering(self) -> u8 {
        match self {
            Self::NonCompliant => 0,
            Self::Pending => 1,
            Self::NotApplicable => 2,
            Self::Exempt => 3,
            Self::Compliant => 4,
        }
    }

    /// Greatest lower bound: the more restrictive state.
    pub fn meet(self, other: Self) -> Self {
        if self.ordering() <= other.ordering() {
            self
        } else {
            other
        }
    }

    /// Least upper bound: the less restrictive state.
    pub fn join(self, other: Self) -> Self {
        if self.ordering() >= other.ordering() {
            self
        } else {
            other
        }
    }

    /// Whether an operation in this state may proceed.
    pub fn is_passing(self) -> bool {
        matches!(self, Self::Compliant | Self::Exempt | Self::NotApplicable)
    }
}

impl PartialOrd for ComplianceState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComplianceState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordering().cmp(&other.ordering())
    }
}

impl fmt::Display for ComplianceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compliant => write!(f, "compliant"),
            Self::NonCompliant => write!(f, "non_compliant"),
            Self::Pending => write!(f, "pending"),
            Self::Exempt => write!(f, "exempt"),
            Self::NotApplicable => write!(f, "not_applicable"),
        }
    }
}
