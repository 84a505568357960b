//! Lifecycle events, appended in the same commit as the change they
//! describe.

use serde::{Deserialize, Serialize};

use covenant_core::{ObligationId, PartyAddress, Timestamp};
use covenant_state::{Action, ObligationKind, ObligationStatus, TransitionRecord};

/// One accepted creation or transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationEvent {
    /// Position in the store-wide event log, starting at 1.
    pub sequence: u64,
    /// Subject.
    pub obligation: ObligationId,
    /// Subject kind.
    pub kind: ObligationKind,
    /// What happened.
    pub action: Action,
    /// Status before; `None` on creation.
    pub from: Option<ObligationStatus>,
    /// Status after.
    pub to: ObligationStatus,
    /// Who did it.
    pub actor: PartyAddress,
    /// Ledger time.
    pub at: Timestamp,
}

impl ObligationEvent {
    pub(crate) fn created(
        obligation: ObligationId,
        kind: ObligationKind,
        status: ObligationStatus,
        actor: PartyAddress,
        at: Timestamp,
    ) -> Self {
        Self {
            sequence: 0,
            obligation,
            kind,
            action: Action::Create,
            from: None,
            to: status,
            actor,
            at,
        }
    }

    pub(crate) fn transitioned(
        obligation: ObligationId,
        kind: ObligationKind,
        record: &TransitionRecord,
    ) -> Self {
        Self {
            sequence: 0,
            obligation,
            kind,
            action: record.action,
            from: Some(record.from),
            to: record.to,
            actor: record.actor.clone(),
            at: record.at,
        }
    }
}
