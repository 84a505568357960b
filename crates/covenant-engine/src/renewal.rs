//! # Recurring Generator
//!
//! Paying a recurring bill stages its successor in the same transaction.
//! The successor's due date is the parent's `next_cycle`; its own cursor
//! is one interval later. The parent's cursor is cleared, so a parent
//! produces at most one child.
//!
//! The generator never runs on its own: it is a hook inside bill payment,
//! and any failure here fails the payment.

use covenant_core::{ObligationId, PartyAddress, Timestamp};
use covenant_state::{Obligation, ObligationStatus, RecordLink, Recurrence, Role, Terms};

use crate::engine::{derive_id, ObligationEngine};
use crate::error::EngineError;
use crate::events::ObligationEvent;
use crate::store::Transaction;

impl ObligationEngine {
    /// Stage the successor of `parent` if it still has a pending cycle.
    ///
    /// Mutates `parent` (cursor cleared, successor linked); the caller
    /// stores it.
    pub(crate) fn renew(
        tx: &mut Transaction<'_>,
        parent: &mut Obligation,
        actor: &PartyAddress,
        now: Timestamp,
    ) -> Result<Option<ObligationId>, EngineError> {
        let Some(terms) = parent.terms.as_bill() else {
            return Ok(None);
        };
        let Some(Recurrence {
            interval,
            next_cycle: Some(due),
        }) = terms.recurrence
        else {
            return Ok(None);
        };

        let mut child_terms = terms.clone();
        child_terms.due_date = due;
        child_terms.recurrence = Some(Recurrence {
            interval,
            next_cycle: Some(due.checked_add(interval)?),
        });

        let counterparty = counterparty_of(parent)?;
        let nonce = tx.next_nonce();
        let id = derive_id(
            parent.kind,
            &parent.created_by,
            &counterparty,
            &parent.reference,
            now,
            nonce,
        )?;

        let child = Obligation {
            id,
            kind: parent.kind,
            created_by: parent.created_by.clone(),
            parties: parent.parties.clone(),
            status: parent.kind.initial_status(),
            jurisdiction: parent.jurisdiction.clone(),
            reference: parent.reference.clone(),
            terms: Terms::Bill(child_terms),
            linked_records: vec![RecordLink::Parent(parent.id)],
            signatures: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };
        tx.insert(child)?;
        tx.record(ObligationEvent::created(
            id,
            parent.kind,
            ObligationStatus::Created,
            actor.clone(),
            now,
        ));

        if let Some(r) = parent
            .terms
            .as_bill_mut()
            .and_then(|t| t.recurrence.as_mut())
        {
            r.next_cycle = None;
        }
        parent.link(RecordLink::Successor(id));
        tracing::info!(parent = %parent.id, successor = %id, due = %due, "recurring bill renewed");
        Ok(Some(id))
    }
}

/// The bill party that did not create it.
fn counterparty_of(bill: &Obligation) -> Result<PartyAddress, EngineError> {
    let payer = bill.party(Role::Payer);
    let payee = bill.party(Role::Payee);
    match (payer, payee) {
        (Some(payer), Some(payee)) if *payer == bill.created_by => Ok(payee.clone()),
        (Some(payer), Some(_)) => Ok(payer.clone()),
        _ => Err(EngineError::invalid("parties", "bill lacks a payer or payee")),
    }
}
