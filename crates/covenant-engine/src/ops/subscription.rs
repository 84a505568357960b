//! Subscriptions: a subscriber charged by a merchant once per interval.

use serde::{Deserialize, Serialize};

use covenant_core::{
    Amount, DocumentId, Interval, JurisdictionCode, ObligationId, PartyAddress, PaymentId,
    Timestamp, ValidationError,
};
use covenant_state::{
    Action, ObligationKind, ObligationStatus, Party, PaymentMethod, RecordLink, Role,
    SubscriptionTerms, Terms,
};

use crate::engine::{Draft, ObligationEngine};
use crate::error::EngineError;
use crate::payments::PaymentRequest;

/// Input to [`ObligationEngine::create_subscription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    /// Who is charged; the subscriber is the creator.
    pub merchant: PartyAddress,
    /// Charge per cycle.
    pub amount: Amount,
    /// Cycle length.
    pub interval: Interval,
    /// First charge date, strictly in the future.
    pub first_due: Timestamp,
    /// After this instant the subscription expires instead of charging.
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    /// Settlement method.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Opaque method details.
    #[serde(default)]
    pub method_data: String,
    /// Caller reference.
    pub reference: String,
    /// Gating jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// What a `process_cycle` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// One cycle was charged and the due date moved one interval.
    Charged {
        /// Dispatched payment.
        payment: PaymentId,
        /// New due date.
        next_due: Timestamp,
    },
    /// The end date had passed; the subscription is now expired.
    Expired,
}

impl ObligationEngine {
    /// Subscribe `subscriber` to a merchant.
    pub fn create_subscription(
        &self,
        subscriber: &PartyAddress,
        sub: NewSubscription,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        let amount = sub.amount.ensure_positive()?;
        if *subscriber == sub.merchant {
            return Err(ValidationError::DuplicateParty(sub.merchant.to_string()).into());
        }
        sub.first_due.require_after(now, "first_due")?;
        if let Some(end) = sub.end_date {
            end.require_after(sub.first_due, "end_date")?;
        }

        let draft = Draft {
            kind: ObligationKind::Subscription,
            creator: subscriber.clone(),
            counterparty: sub.merchant.clone(),
            reference: sub.reference,
            jurisdiction: sub.jurisdiction,
            parties: vec![
                Party::new(subscriber.clone(), Role::Payer),
                Party::new(sub.merchant, Role::Payee),
            ],
            terms: Terms::Subscription(SubscriptionTerms {
                amount,
                interval: sub.interval,
                next_due: sub.first_due,
                end_date: sub.end_date,
                method: sub.method,
                method_data: sub.method_data,
                cycles_processed: 0,
            }),
            signatures: None,
            links: Vec::new(),
            documents: sub.documents,
        };
        let services = self.services();
        self.store
            .transact(|tx| self.create_in(tx, &services, draft, now))
    }

    /// Merchant charges one cycle.
    ///
    /// Past the end date the subscription expires instead. Otherwise the
    /// call fails with [`EngineError::NotDue`] before the due date and,
    /// once due, charges exactly one cycle however many have elapsed.
    pub fn process_cycle(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<CycleOutcome, EngineError> {
        let now = self.now();
        let services = self.services();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Subscription)?;
            let held = record.roles_of(caller);
            let edge = Self::guard(&record, caller, Action::ProcessCycle, &held)?;
            let terms = subscription_terms(&record.terms)?.clone();

            if terms.end_date.is_some_and(|end| now > end) {
                let expire = Self::guard(&record, caller, Action::Expire, &held)?;
                Self::apply(tx, &mut record, expire, caller, now);
                tx.put(record);
                return Ok(CycleOutcome::Expired);
            }
            if !terms.next_due.is_due_at(now) {
                return Err(EngineError::NotDue {
                    id: *id,
                    due: terms.next_due,
                    now,
                });
            }
            let next_due = terms.next_due.checked_add(terms.interval)?;
            let payer = record
                .party(Role::Payer)
                .cloned()
                .ok_or_else(|| EngineError::invalid("parties", "subscription has no subscriber"))?;

            let payment = Self::dispatch(
                &services,
                PaymentRequest {
                    payer,
                    payee: caller.clone(),
                    amount: terms.amount,
                    method: terms.method,
                    method_data: terms.method_data,
                    obligation: *id,
                },
            )?;
            if let Some(t) = record.terms.as_subscription_mut() {
                t.next_due = next_due;
                t.cycles_processed += 1;
            }
            record.link(RecordLink::Payment(payment));
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(CycleOutcome::Charged { payment, next_due })
        })
    }

    /// Either side pauses an active subscription.
    pub fn pause_subscription(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Subscription, caller, Action::Pause)
    }

    /// Either side resumes a paused subscription. The due date is kept.
    pub fn resume_subscription(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Subscription, caller, Action::Resume)
    }

    /// Either side cancels an active subscription.
    pub fn cancel_subscription(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Subscription, caller, Action::Cancel)
    }

    /// Merchant expires a subscription whose end date has passed.
    pub fn expire_subscription(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        let now = self.now();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Subscription)?;
            let edge = Self::guard(&record, caller, Action::Expire, &record.roles_of(caller))?;
            let Some(end) = subscription_terms(&record.terms)?.end_date else {
                return Err(EngineError::invalid("end_date", "subscription has no end date"));
            };
            if now <= end {
                return Err(EngineError::NotDue {
                    id: *id,
                    due: end,
                    now,
                });
            }
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(edge.to)
        })
    }
}

fn subscription_terms(terms: &Terms) -> Result<&SubscriptionTerms, EngineError> {
    terms
        .as_subscription()
        .ok_or_else(|| EngineError::invalid("terms", "expected subscription terms"))
}
