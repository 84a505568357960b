//! # Engine Errors
//!
//! Every failure aborts the whole operation with no partial mutation and
//! no side effect. Each variant belongs to exactly one [`ErrorCategory`] so
//! a client can decide whether resubmitting makes sense.

use std::fmt;

use thiserror::Error;

use covenant_core::{
    CanonicalizationError, JurisdictionCode, ObligationId, PartyAddress, TemplateId, Timestamp,
    ValidationError,
};
use covenant_state::{Action, GuardError, ObligationKind, ObligationStatus, SignatureError};

/// Caller-facing classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller lacks the role or privilege.
    Authorization,
    /// The record is not in a status the operation accepts.
    State,
    /// Malformed or out-of-range input.
    Validation,
    /// Jurisdiction, identity, or gate rejected the operation.
    Compliance,
    /// A collaborator failed or answered inconsistently.
    Dependency,
}

impl ErrorCategory {
    /// Whether resubmitting later (or with fixed input) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::State | Self::Validation)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authorization => "authorization",
            Self::State => "state",
            Self::Validation => "validation",
            Self::Compliance => "compliance",
            Self::Dependency => "dependency",
        })
    }
}

/// Errors surfaced by the obligation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    // ── Authorization ────────────────────────────────────────────────
    /// The caller holds none of the required roles.
    #[error("{caller} may not {operation}: {reason}")]
    Unauthorized {
        /// Operation name (e.g. `bill.pay`).
        operation: String,
        /// Rejected caller.
        caller: PartyAddress,
        /// What was missing.
        reason: String,
    },
    /// A privileged call by someone other than the administrator.
    #[error("{0} is not the engine administrator")]
    NotAdministrator(PartyAddress),

    // ── State ────────────────────────────────────────────────────────
    /// No edge for the action from the current status.
    #[error("{kind} {id} cannot {action} from status {from}")]
    InvalidTransition {
        /// Obligation.
        id: ObligationId,
        /// Its kind.
        kind: ObligationKind,
        /// Current status.
        from: ObligationStatus,
        /// Rejected action.
        action: Action,
    },
    /// A time-gated action invoked too early.
    #[error("{id} is not due until {due} (now {now})")]
    NotDue {
        /// Obligation.
        id: ObligationId,
        /// When the action becomes possible.
        due: Timestamp,
        /// Ledger time of the call.
        now: Timestamp,
    },
    /// The party already signed.
    #[error("{party} has already attested to {id}")]
    AlreadyAttested {
        /// Contract.
        id: ObligationId,
        /// Repeat signer.
        party: PartyAddress,
    },
    /// A referenced record is not in the status the operation needs.
    #[error("{id} is {actual}, expected {expected}")]
    PrerequisiteStatus {
        /// Referenced record.
        id: ObligationId,
        /// Status it is in.
        actual: ObligationStatus,
        /// Status it must be in.
        expected: ObligationStatus,
    },
    /// Template has been deactivated.
    #[error("template {0} is inactive")]
    TemplateInactive(TemplateId),
    /// The policy's cover ended before the claim was raised.
    #[error("cover under {policy} ended at {end} (now {now})")]
    CoverEnded {
        /// Policy.
        policy: ObligationId,
        /// End of cover.
        end: Timestamp,
        /// Ledger time of the call.
        now: Timestamp,
    },

    // ── Validation ───────────────────────────────────────────────────
    /// Malformed primitive input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Input rejected for a reason specific to the operation.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Offending field.
        field: String,
        /// Why.
        reason: String,
    },
    /// No obligation with this id.
    #[error("unknown obligation {0}")]
    UnknownObligation(ObligationId),
    /// No template with this id.
    #[error("unknown template {0}")]
    UnknownTemplate(TemplateId),
    /// The id names a record of another kind.
    #[error("{id} is a {actual}, expected a {expected}")]
    WrongKind {
        /// Obligation.
        id: ObligationId,
        /// Its kind.
        actual: ObligationKind,
        /// Kind the operation needs.
        expected: ObligationKind,
    },

    // ── Compliance ───────────────────────────────────────────────────
    /// Jurisdiction registry reports the jurisdiction inactive.
    #[error("jurisdiction {0} is not active")]
    JurisdictionInactive(JurisdictionCode),
    /// A party is not verified for the jurisdiction.
    #[error("{party} is not identity-verified in {jurisdiction}")]
    IdentityNotVerified {
        /// Unverified party.
        party: PartyAddress,
        /// Jurisdiction checked.
        jurisdiction: JurisdictionCode,
    },
    /// The compliance gate denied the operation.
    #[error("compliance gate denied {operation} in {jurisdiction}: {reason}")]
    ComplianceRejected {
        /// Jurisdiction evaluated.
        jurisdiction: JurisdictionCode,
        /// Operation tag.
        operation: String,
        /// Gate reason code.
        reason: String,
    },

    // ── Dependency ───────────────────────────────────────────────────
    /// A referenced record could not be resolved consistently.
    #[error("could not resolve {kind} {id}: {reason}")]
    Resolution {
        /// Record kind (`policy`, `item`).
        kind: &'static str,
        /// Requested id.
        id: String,
        /// What went wrong.
        reason: String,
    },
    /// The payment processor refused or failed.
    #[error("payment dispatch failed: {0}")]
    PaymentFailed(String),
    /// A derived id is already taken.
    #[error("identifier collision on {0}")]
    IdCollision(ObligationId),
    /// Intent could not be canonicalized for hashing or gating.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl EngineError {
    /// The caller-facing category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } | Self::NotAdministrator(_) => ErrorCategory::Authorization,
            Self::InvalidTransition { .. }
            | Self::NotDue { .. }
            | Self::AlreadyAttested { .. }
            | Self::PrerequisiteStatus { .. }
            | Self::TemplateInactive(_)
            | Self::CoverEnded { .. } => ErrorCategory::State,
            Self::Validation(_)
            | Self::InvalidInput { .. }
            | Self::UnknownObligation(_)
            | Self::UnknownTemplate(_)
            | Self::WrongKind { .. } => ErrorCategory::Validation,
            Self::JurisdictionInactive(_)
            | Self::IdentityNotVerified { .. }
            | Self::ComplianceRejected { .. } => ErrorCategory::Compliance,
            Self::Resolution { .. }
            | Self::PaymentFailed(_)
            | Self::IdCollision(_)
            | Self::Canonicalization(_) => ErrorCategory::Dependency,
        }
    }

    /// Shorthand for [`ErrorCategory::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Map a rejected guard on `id` by `caller`.
    pub(crate) fn from_guard(err: GuardError, id: ObligationId, caller: &PartyAddress) -> Self {
        match err {
            GuardError::Unauthorized {
                kind,
                action,
                required,
            } => Self::Unauthorized {
                operation: format!("{kind}.{action}"),
                caller: caller.clone(),
                reason: format!(
                    "requires one of [{}]",
                    required
                        .iter()
                        .map(|r| r.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
            GuardError::UndefinedAction { kind, action } => Self::InvalidInput {
                field: "action".to_string(),
                reason: format!("{action} is not defined for {kind}"),
            },
            GuardError::NoEdge { kind, from, action } => Self::InvalidTransition {
                id,
                kind,
                from,
                action,
            },
        }
    }

    /// Map a rejected attestation on contract `id`.
    pub(crate) fn from_signature(err: SignatureError, id: ObligationId) -> Self {
        match err {
            SignatureError::NotASignatory(party) => Self::Unauthorized {
                operation: "contract.sign".to_string(),
                caller: party,
                reason: "not a required signatory".to_string(),
            },
            SignatureError::AlreadyAttested(party) => Self::AlreadyAttested { id, party },
        }
    }

    /// Shorthand for [`EngineError::InvalidInput`].
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
