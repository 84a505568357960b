//! # Guard Errors
//!
//! Failures raised by the lifecycle table and the signature book. Neither
//! type mutates anything; the engine maps them onto caller-facing
//! categories.

use thiserror::Error;

use covenant_core::PartyAddress;

use crate::kind::{ObligationKind, ObligationStatus};
use crate::role::Role;
use crate::table::Action;

/// A rejected transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The action is not defined for this kind at all.
    #[error("action {action} is not defined for {kind} obligations")]
    UndefinedAction {
        /// Obligation kind.
        kind: ObligationKind,
        /// Requested action.
        action: Action,
    },
    /// The caller holds none of the roles the action requires.
    #[error("{kind}.{action} requires one of [{}]", join_roles(.required))]
    Unauthorized {
        /// Obligation kind.
        kind: ObligationKind,
        /// Requested action.
        action: Action,
        /// Roles any of which would have been accepted.
        required: Vec<Role>,
    },
    /// No edge leaves the current status under this action.
    #[error("no {kind} transition from {from} on {action}")]
    NoEdge {
        /// Obligation kind.
        kind: ObligationKind,
        /// Current status.
        from: ObligationStatus,
        /// Requested action.
        action: Action,
    },
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A rejected attestation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The party is not a required signatory.
    #[error("{0} is not a required signatory")]
    NotASignatory(PartyAddress),
    /// The party already attested.
    #[error("{0} has already attested")]
    AlreadyAttested(PartyAddress),
}
