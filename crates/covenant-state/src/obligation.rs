//! # Obligation Record
//!
//! The single record type behind every application. Parties and
//! jurisdiction are fixed at creation; status moves only through
//! [`Obligation::apply`], which takes an edge the lifecycle table already
//! accepted.

use serde::{Deserialize, Serialize};

use covenant_core::{
    DocumentId, ItemId, JurisdictionCode, ObligationId, PartyAddress, PaymentId, TemplateId,
    Timestamp,
};

use crate::kind::{ObligationKind, ObligationStatus};
use crate::role::{Party, Role};
use crate::signature::SignatureBook;
use crate::table::{Action, Edge};
use crate::terms::Terms;

/// A typed reference from an obligation to an associated record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "relation", content = "id", rename_all = "snake_case")]
pub enum RecordLink {
    /// A document registered against the obligation.
    Document(DocumentId),
    /// A payment dispatched on the obligation's behalf.
    Payment(PaymentId),
    /// The obligation this one was renewed from.
    Parent(ObligationId),
    /// The obligation generated by renewing this one.
    Successor(ObligationId),
    /// The policy a claim is raised against.
    Policy(ObligationId),
    /// The supply-chain item under verification.
    Item(ItemId),
    /// The template a contract was instantiated from.
    Template(TemplateId),
}

/// One accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before.
    pub from: ObligationStatus,
    /// Status after.
    pub to: ObligationStatus,
    /// Triggering action.
    pub action: Action,
    /// Who triggered it.
    pub actor: PartyAddress,
    /// Ledger time of the transition.
    pub at: Timestamp,
}

/// A bill, subscription, policy, claim, contract, or verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Content-derived identifier.
    pub id: ObligationId,
    /// Selects the lifecycle table subset.
    pub kind: ObligationKind,
    /// Address that created the record.
    pub created_by: PartyAddress,
    /// Participants, in creation order. Never empty.
    pub parties: Vec<Party>,
    /// Current status.
    pub status: ObligationStatus,
    /// Gating jurisdiction. Immutable.
    pub jurisdiction: JurisdictionCode,
    /// Caller-supplied reference string the id was derived from.
    pub reference: String,
    /// Kind-specific payload.
    pub terms: Terms,
    /// Associated records, in the order they were linked, without duplicates.
    pub linked_records: Vec<RecordLink>,
    /// Present on contracts only.
    pub signatures: Option<SignatureBook>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the last accepted transition.
    pub updated_at: Timestamp,
    /// Accepted transitions, oldest first.
    pub history: Vec<TransitionRecord>,
}

impl Obligation {
    /// Roles `address` holds on this record.
    pub fn roles_of(&self, address: &PartyAddress) -> Vec<Role> {
        self.parties
            .iter()
            .filter(|p| &p.address == address)
            .map(|p| p.role)
            .collect()
    }

    /// First address holding `role`.
    pub fn party(&self, role: Role) -> Option<&PartyAddress> {
        self.parties
            .iter()
            .find(|p| p.role == role)
            .map(|p| &p.address)
    }

    /// Distinct addresses, in order of first appearance.
    pub fn addresses(&self) -> Vec<&PartyAddress> {
        let mut out: Vec<&PartyAddress> = Vec::new();
        for p in &self.parties {
            if !out.contains(&&p.address) {
                out.push(&p.address);
            }
        }
        out
    }

    /// Whether the current status is terminal for the record's kind.
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal(self.status)
    }

    /// Append a link unless already present.
    pub fn link(&mut self, link: RecordLink) {
        if !self.linked_records.contains(&link) {
            self.linked_records.push(link);
        }
    }

    /// Apply an accepted edge: set the status, stamp `updated_at`, and
    /// append to the history.
    ///
    /// `updated_at` never moves backwards even if `at` does.
    pub fn apply(&mut self, edge: &Edge, actor: &PartyAddress, at: Timestamp) -> TransitionRecord {
        debug_assert_eq!(edge.kind, self.kind);
        debug_assert_eq!(edge.from, self.status);
        let record = TransitionRecord {
            from: self.status,
            to: edge.to,
            action: edge.action,
            actor: actor.clone(),
            at,
        };
        self.status = edge.to;
        self.updated_at = self.updated_at.max(at);
        self.history.push(record.clone());
        record
    }
}
