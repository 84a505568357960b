//! # Obligation Kinds and Statuses
//!
//! One status enumeration covers every kind. Which statuses a kind may
//! occupy, and which are terminal for it, is derived from the edge table in
//! [`crate::table`] rather than restated here.

use serde::{Deserialize, Serialize};

use crate::table;

/// The application an obligation belongs to. Selects the edge subset of
/// the lifecycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    /// A one-off or recurring bill between a payer and a payee.
    Bill,
    /// A recurring charge from a subscriber to a merchant.
    Subscription,
    /// An insurance policy between an insurer and a beneficiary.
    Policy,
    /// A claim raised against a policy.
    Claim,
    /// A multi-party legal contract.
    Contract,
    /// A supply-chain verification request against a registered item.
    Verification,
}

impl ObligationKind {
    /// All kinds, in declaration order.
    pub const ALL: [ObligationKind; 6] = [
        Self::Bill,
        Self::Subscription,
        Self::Policy,
        Self::Claim,
        Self::Contract,
        Self::Verification,
    ];

    /// Status a freshly created obligation of this kind starts in.
    pub fn initial_status(&self) -> ObligationStatus {
        match self {
            Self::Bill | Self::Policy => ObligationStatus::Created,
            Self::Subscription => ObligationStatus::Active,
            Self::Claim => ObligationStatus::Submitted,
            Self::Contract => ObligationStatus::Draft,
            Self::Verification => ObligationStatus::Requested,
        }
    }

    /// Operation tag prefix used with the compliance gate (e.g. `bill.create`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::Subscription => "subscription",
            Self::Policy => "policy",
            Self::Claim => "claim",
            Self::Contract => "contract",
            Self::Verification => "verification",
        }
    }

    /// Whether `status` belongs to this kind's enumeration: the initial
    /// status or any status reachable through an edge.
    pub fn admits(&self, status: ObligationStatus) -> bool {
        status == self.initial_status()
            || table::edges_for_kind(*self).any(|e| e.from == status || e.to == status)
    }

    /// Whether `status` is terminal for this kind (no outgoing edge).
    pub fn is_terminal(&self, status: ObligationStatus) -> bool {
        self.admits(status) && !table::edges_for_kind(*self).any(|e| e.from == status)
    }
}

impl std::fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status, shared across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    /// Bill or policy recorded, not yet acted on.
    Created,
    /// Bill issued to the payer.
    Pending,
    /// Bill past its due date.
    Overdue,
    /// Bill or claim settled (terminal).
    Paid,
    /// Withdrawn before completion (terminal).
    Cancelled,
    /// Subscription or policy in force.
    Active,
    /// Subscription temporarily halted.
    Paused,
    /// Subscription or policy past its end date (terminal).
    Expired,
    /// Claim raised, awaiting the insurer.
    Submitted,
    /// Claim being assessed.
    UnderReview,
    /// Claim accepted, awaiting payout.
    Approved,
    /// Claim or verification declined.
    Rejected,
    /// Claim or contract contested (terminal).
    Disputed,
    /// Contract being drafted.
    Draft,
    /// Contract awaiting attestations.
    PendingSignatures,
    /// Contract fully attested.
    Executed,
    /// Contract ended by a party (terminal).
    Terminated,
    /// Verification raised, awaiting the verifier.
    Requested,
    /// Verification passed (terminal).
    Verified,
}

impl ObligationStatus {
    /// The canonical `snake_case` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Expired => "expired",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disputed => "disputed",
            Self::Draft => "draft",
            Self::PendingSignatures => "pending_signatures",
            Self::Executed => "executed",
            Self::Terminated => "terminated",
            Self::Requested => "requested",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
