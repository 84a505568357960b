//! # Lifecycle Table
//!
//! Every legal transition of every obligation kind, as data. The engine
//! never matches on `(kind, status)` pairs itself; it asks [`guard`] for the
//! target status and applies it.
//!
//! ## Guard order
//!
//! 1. The action must be defined for the kind.
//! 2. The caller must hold one of the roles listed on the action's edges
//!    for that kind (checked before the status).
//! 3. An edge must leave the current status under the action.
//!
//! Time-based preconditions (a subscription's due date, a policy's end
//! date) are checked by the engine after the table accepts the transition.

use serde::{Deserialize, Serialize};

use crate::error::GuardError;
use crate::kind::{ObligationKind, ObligationStatus};
use crate::role::Role;

/// An event that drives a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Record creation. Never an edge; used in event logs only.
    Create,
    /// Bill sent to the payer.
    Issue,
    /// Bill flagged as past due.
    MarkOverdue,
    /// Settle a bill or pay out a claim.
    Pay,
    /// Withdraw a bill, subscription or policy.
    Cancel,
    /// Charge one subscription cycle.
    ProcessCycle,
    /// Halt a subscription.
    Pause,
    /// Restart a paused subscription.
    Resume,
    /// End a subscription or policy at its end date.
    Expire,
    /// Put a policy in force.
    Activate,
    /// Start assessing a claim.
    StartReview,
    /// Accept a claim or pass a verification.
    Approve,
    /// Decline a claim or fail a verification.
    Reject,
    /// Contest a rejected claim or an executed contract.
    Dispute,
    /// Close the drafting phase of a contract.
    FinalizeDraft,
    /// Attest to a contract.
    Sign,
    /// Promote a fully attested contract.
    Execute,
    /// End an executed contract.
    Terminate,
}

impl Action {
    /// The canonical `snake_case` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Issue => "issue",
            Self::MarkOverdue => "mark_overdue",
            Self::Pay => "pay",
            Self::Cancel => "cancel",
            Self::ProcessCycle => "process_cycle",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Expire => "expire",
            Self::Activate => "activate",
            Self::StartReview => "start_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Dispute => "dispute",
            Self::FinalizeDraft => "finalize_draft",
            Self::Sign => "sign",
            Self::Execute => "execute",
            Self::Terminate => "terminate",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Kind the edge belongs to.
    pub kind: ObligationKind,
    /// Status the obligation must be in.
    pub from: ObligationStatus,
    /// Triggering action.
    pub action: Action,
    /// Status after the transition.
    pub to: ObligationStatus,
    /// Any one of these roles may trigger the edge.
    pub roles: &'static [Role],
}

// ── The table ────────────────────────────────────────────────────────

use Action as A;
use ObligationKind as K;
use ObligationStatus as S;

const PAYEE: &[Role] = &[Role::Payee];
const PAYER: &[Role] = &[Role::Payer];
const EITHER_SIDE: &[Role] = &[Role::Payer, Role::Payee];
const INSURER: &[Role] = &[Role::Insurer];
const CLAIMANT: &[Role] = &[Role::Claimant];
const CREATOR: &[Role] = &[Role::Creator];
const SIGNATORY: &[Role] = &[Role::Signatory];
const CONTRACT_PARTY: &[Role] = &[Role::Creator, Role::Signatory];
const VERIFIER: &[Role] = &[Role::Verifier];

const fn edge(
    kind: ObligationKind,
    from: ObligationStatus,
    action: Action,
    to: ObligationStatus,
    roles: &'static [Role],
) -> Edge {
    Edge {
        kind,
        from,
        action,
        to,
        roles,
    }
}

/// Every legal transition, grouped by kind.
pub static EDGES: &[Edge] = &[
    // Bill
    edge(K::Bill, S::Created, A::Issue, S::Pending, PAYEE),
    edge(K::Bill, S::Created, A::MarkOverdue, S::Overdue, PAYEE),
    edge(K::Bill, S::Pending, A::MarkOverdue, S::Overdue, PAYEE),
    edge(K::Bill, S::Created, A::Pay, S::Paid, PAYER),
    edge(K::Bill, S::Pending, A::Pay, S::Paid, PAYER),
    edge(K::Bill, S::Overdue, A::Pay, S::Paid, PAYER),
    edge(K::Bill, S::Created, A::Cancel, S::Cancelled, EITHER_SIDE),
    edge(K::Bill, S::Pending, A::Cancel, S::Cancelled, EITHER_SIDE),
    // Subscription
    edge(K::Subscription, S::Active, A::ProcessCycle, S::Active, PAYEE),
    edge(K::Subscription, S::Active, A::Expire, S::Expired, PAYEE),
    edge(K::Subscription, S::Active, A::Pause, S::Paused, EITHER_SIDE),
    edge(K::Subscription, S::Paused, A::Resume, S::Active, EITHER_SIDE),
    edge(K::Subscription, S::Active, A::Cancel, S::Cancelled, EITHER_SIDE),
    // Policy
    edge(K::Policy, S::Created, A::Activate, S::Active, INSURER),
    edge(K::Policy, S::Active, A::Cancel, S::Cancelled, &[Role::Insurer, Role::Beneficiary]),
    edge(K::Policy, S::Active, A::Expire, S::Expired, INSURER),
    // Claim
    edge(K::Claim, S::Submitted, A::StartReview, S::UnderReview, INSURER),
    edge(K::Claim, S::Submitted, A::Approve, S::Approved, INSURER),
    edge(K::Claim, S::UnderReview, A::Approve, S::Approved, INSURER),
    edge(K::Claim, S::Submitted, A::Reject, S::Rejected, INSURER),
    edge(K::Claim, S::UnderReview, A::Reject, S::Rejected, INSURER),
    edge(K::Claim, S::Approved, A::Pay, S::Paid, INSURER),
    edge(K::Claim, S::Rejected, A::Dispute, S::Disputed, CLAIMANT),
    // Contract
    edge(K::Contract, S::Draft, A::FinalizeDraft, S::PendingSignatures, CREATOR),
    edge(K::Contract, S::PendingSignatures, A::Sign, S::PendingSignatures, SIGNATORY),
    edge(K::Contract, S::PendingSignatures, A::Execute, S::Executed, SIGNATORY),
    edge(K::Contract, S::Executed, A::Terminate, S::Terminated, CONTRACT_PARTY),
    edge(K::Contract, S::Executed, A::Dispute, S::Disputed, CONTRACT_PARTY),
    // Verification
    edge(K::Verification, S::Requested, A::Approve, S::Verified, VERIFIER),
    edge(K::Verification, S::Requested, A::Reject, S::Rejected, VERIFIER),
];

// ── Queries ──────────────────────────────────────────────────────────

/// All edges of one kind.
pub fn edges_for_kind(kind: ObligationKind) -> impl Iterator<Item = &'static Edge> {
    EDGES.iter().filter(move |e| e.kind == kind)
}

/// Union of the roles accepted for `action` on `kind`, in table order
/// without duplicates. Empty when the action is undefined for the kind.
pub fn roles_for(kind: ObligationKind, action: Action) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();
    for e in edges_for_kind(kind).filter(|e| e.action == action) {
        for r in e.roles {
            if !roles.contains(r) {
                roles.push(*r);
            }
        }
    }
    roles
}

/// Check the caller's roles against `action` on `kind`.
///
/// # Errors
///
/// [`GuardError::UndefinedAction`] if no edge carries the action,
/// [`GuardError::Unauthorized`] if `held` shares no role with it.
pub fn authorize(kind: ObligationKind, action: Action, held: &[Role]) -> Result<(), GuardError> {
    let required = roles_for(kind, action);
    if required.is_empty() {
        return Err(GuardError::UndefinedAction { kind, action });
    }
    if held.iter().any(|r| required.contains(r)) {
        Ok(())
    } else {
        Err(GuardError::Unauthorized {
            kind,
            action,
            required,
        })
    }
}

/// Find the edge leaving `from` under `action`.
///
/// # Errors
///
/// [`GuardError::NoEdge`] when none exists.
pub fn lookup(
    kind: ObligationKind,
    from: ObligationStatus,
    action: Action,
) -> Result<&'static Edge, GuardError> {
    edges_for_kind(kind)
        .find(|e| e.from == from && e.action == action)
        .ok_or(GuardError::NoEdge { kind, from, action })
}

/// Run the full guard (role, then status) and return the edge to apply.
///
/// # Errors
///
/// See [`authorize`] and [`lookup`].
pub fn guard(
    kind: ObligationKind,
    from: ObligationStatus,
    action: Action,
    held: &[Role],
) -> Result<&'static Edge, GuardError> {
    authorize(kind, action, held)?;
    lookup(kind, from, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Table shape ──────────────────────────────────────────────────

    #[test]
    fn no_duplicate_edges() {
        for (i, a) in EDGES.iter().enumerate() {
            for b in &EDGES[i + 1..] {
                assert!(
                    !(a.kind == b.kind && a.from == b.from && a.action == b.action),
                    "duplicate edge {:?} {:?} {:?}",
                    a.kind,
                    a.from,
                    a.action
                );
            }
        }
    }

    #[test]
    fn every_edge_has_roles_and_stays_in_kind() {
        for e in EDGES {
            assert!(!e.roles.is_empty());
            assert!(e.kind.admits(e.from));
            assert!(e.kind.admits(e.to));
            assert_ne!(e.action, Action::Create);
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for kind in ObligationKind::ALL {
            for e in edges_for_kind(kind) {
                assert!(!kind.is_terminal(e.from));
            }
        }
    }

    // ── Guards ───────────────────────────────────────────────────────

    #[test]
    fn bill_pay_allowed_from_early_states() {
        for from in [S::Created, S::Pending, S::Overdue] {
            let e = guard(K::Bill, from, A::Pay, &[Role::Payer]).unwrap();
            assert_eq!(e.to, S::Paid);
        }
    }

    #[test]
    fn bill_pay_by_payee_is_unauthorized() {
        let err = guard(K::Bill, S::Created, A::Pay, &[Role::Payee]).unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized { .. }));
    }

    #[test]
    fn role_checked_before_status() {
        // Wrong role and wrong status: the role failure wins.
        let err = guard(K::Bill, S::Paid, A::Pay, &[Role::Payee]).unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized { .. }));
        let err = guard(K::Bill, S::Paid, A::Pay, &[Role::Payer]).unwrap_err();
        assert!(matches!(err, GuardError::NoEdge { .. }));
    }

    #[test]
    fn bill_cannot_cancel_when_overdue() {
        let err = guard(K::Bill, S::Overdue, A::Cancel, &[Role::Payer]).unwrap_err();
        assert_eq!(
            err,
            GuardError::NoEdge {
                kind: K::Bill,
                from: S::Overdue,
                action: A::Cancel
            }
        );
    }

    #[test]
    fn undefined_action_for_kind() {
        let err = authorize(K::Bill, A::Sign, &[Role::Payer]).unwrap_err();
        assert!(matches!(err, GuardError::UndefinedAction { .. }));
    }

    #[test]
    fn claim_has_no_review_self_loop() {
        assert!(lookup(K::Claim, S::UnderReview, A::StartReview).is_err());
    }

    #[test]
    fn claim_dispute_only_from_rejected() {
        assert!(guard(K::Claim, S::Rejected, A::Dispute, &[Role::Claimant]).is_ok());
        assert!(guard(K::Claim, S::Approved, A::Dispute, &[Role::Claimant]).is_err());
        assert!(guard(K::Claim, S::Rejected, A::Dispute, &[Role::Insurer]).is_err());
    }

    #[test]
    fn subscription_pause_resume_cycle() {
        let paused = guard(K::Subscription, S::Active, A::Pause, &[Role::Payer]).unwrap();
        let resumed = guard(K::Subscription, paused.to, A::Resume, &[Role::Payee]).unwrap();
        assert_eq!(resumed.to, S::Active);
        assert!(guard(K::Subscription, S::Paused, A::ProcessCycle, &[Role::Payee]).is_err());
    }

    #[test]
    fn contract_sign_keeps_pending_until_execute() {
        let e = guard(K::Contract, S::PendingSignatures, A::Sign, &[Role::Signatory]).unwrap();
        assert_eq!(e.to, S::PendingSignatures);
        let e = lookup(K::Contract, S::PendingSignatures, A::Execute).unwrap();
        assert_eq!(e.to, S::Executed);
        assert!(guard(K::Contract, S::Draft, A::Sign, &[Role::Signatory]).is_err());
    }

    #[test]
    fn roles_for_merges_edges() {
        assert_eq!(roles_for(K::Contract, A::Terminate), vec![Role::Creator, Role::Signatory]);
        assert!(roles_for(K::Verification, A::Pay).is_empty());
    }

    #[test]
    fn action_display_is_snake_case() {
        assert_eq!(A::MarkOverdue.to_string(), "mark_overdue");
        assert_eq!(A::FinalizeDraft.to_string(), "finalize_draft");
    }
}
