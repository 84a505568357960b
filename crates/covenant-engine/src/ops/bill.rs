//! Bills: one-off or recurring, payer and payee.

use serde::{Deserialize, Serialize};

use covenant_core::{
    Amount, DocumentId, Interval, JurisdictionCode, ObligationId, PartyAddress, PaymentId,
    Timestamp, ValidationError,
};
use covenant_state::{
    Action, BillTerms, ObligationKind, ObligationStatus, Party, PaymentMethod, RecordLink,
    Recurrence, Role, Terms,
};

use crate::engine::{Draft, ObligationEngine};
use crate::error::EngineError;
use crate::payments::PaymentRequest;

/// Input to [`ObligationEngine::create_bill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBill {
    /// Who pays.
    pub payer: PartyAddress,
    /// Who is paid.
    pub payee: PartyAddress,
    /// Amount owed.
    pub amount: Amount,
    /// Must lie strictly in the future.
    pub due_date: Timestamp,
    /// Settlement method.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Opaque method details.
    #[serde(default)]
    pub method_data: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Present for recurring bills.
    #[serde(default)]
    pub interval: Option<Interval>,
    /// Caller reference; part of the id seed.
    pub reference: String,
    /// Gating jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// Result of a bill payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPayment {
    /// Dispatched payment.
    pub payment: PaymentId,
    /// Generated successor of a recurring bill.
    pub successor: Option<ObligationId>,
}

impl ObligationEngine {
    /// Create a bill. The creator must be its payer or payee.
    pub fn create_bill(
        &self,
        creator: &PartyAddress,
        bill: NewBill,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        let amount = bill.amount.ensure_positive()?;
        if bill.payer == bill.payee {
            return Err(ValidationError::DuplicateParty(bill.payer.to_string()).into());
        }
        bill.due_date.require_after(now, "due_date")?;
        let recurrence = match bill.interval {
            Some(interval) => Some(Recurrence {
                interval,
                next_cycle: Some(bill.due_date.checked_add(interval)?),
            }),
            None => None,
        };
        let counterparty = if *creator == bill.payer {
            bill.payee.clone()
        } else if *creator == bill.payee {
            bill.payer.clone()
        } else {
            return Err(EngineError::Unauthorized {
                operation: "bill.create".to_string(),
                caller: creator.clone(),
                reason: "creator must be the payer or the payee".to_string(),
            });
        };

        let draft = Draft {
            kind: ObligationKind::Bill,
            creator: creator.clone(),
            counterparty,
            reference: bill.reference,
            jurisdiction: bill.jurisdiction,
            parties: vec![
                Party::new(bill.payer, Role::Payer),
                Party::new(bill.payee, Role::Payee),
            ],
            terms: Terms::Bill(BillTerms {
                amount,
                due_date: bill.due_date,
                method: bill.method,
                method_data: bill.method_data,
                description: bill.description,
                recurrence,
            }),
            signatures: None,
            links: Vec::new(),
            documents: bill.documents,
        };
        let services = self.services();
        self.store
            .transact(|tx| self.create_in(tx, &services, draft, now))
    }

    /// Payee issues the bill to the payer (`created → pending`).
    pub fn issue_bill(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Bill, caller, Action::Issue)
    }

    /// Payee flags the bill overdue once its due date is reached.
    pub fn mark_overdue(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        let now = self.now();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Bill)?;
            let edge = Self::guard(&record, caller, Action::MarkOverdue, &record.roles_of(caller))?;
            let due = bill_terms(&record.terms)?.due_date;
            if !due.is_due_at(now) {
                return Err(EngineError::NotDue { id: *id, due, now });
            }
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(edge.to)
        })
    }

    /// Payer or payee withdraws an unpaid bill.
    pub fn cancel_bill(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Bill, caller, Action::Cancel)
    }

    /// Payer settles the bill.
    ///
    /// Bills are payable as soon as they exist; the due date does not gate
    /// payment. A recurring bill stages its successor before the payment
    /// is dispatched, and dispatch is the last fallible step.
    pub fn pay_bill(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<BillPayment, EngineError> {
        let now = self.now();
        let services = self.services();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Bill)?;
            let edge = Self::guard(&record, caller, Action::Pay, &record.roles_of(caller))?;
            let terms = bill_terms(&record.terms)?.clone();
            let payee = record
                .party(Role::Payee)
                .cloned()
                .ok_or_else(|| EngineError::invalid("parties", "bill has no payee"))?;

            let successor = Self::renew(tx, &mut record, caller, now)?;

            let payment = Self::dispatch(
                &services,
                PaymentRequest {
                    payer: caller.clone(),
                    payee,
                    amount: terms.amount,
                    method: terms.method,
                    method_data: terms.method_data,
                    obligation: *id,
                },
            )?;
            record.link(RecordLink::Payment(payment));
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(BillPayment {
                payment,
                successor,
            })
        })
    }
}

fn bill_terms(terms: &Terms) -> Result<&BillTerms, EngineError> {
    terms
        .as_bill()
        .ok_or_else(|| EngineError::invalid("terms", "expected bill terms"))
}
