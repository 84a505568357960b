//! # Bill Lifecycle Tests
//!
//! Creation guards, payment, recurring renewal, and atomic failure of the
//! payment operation.

mod common;

use std::sync::Arc;

use common::*;
use covenant_compliance::{AmountCeiling, RulebookGate};
use covenant_core::{Amount, DocumentId, Timestamp};
use covenant_engine::{EngineError, ErrorCategory};
use covenant_state::{ObligationStatus, RecordLink};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn test_due_date_must_be_strictly_future() {
    let h = Harness::new();
    let mut past = bill(100, None, "inv-past");
    past.due_date = start();
    let err = h.engine.create_bill(&addr("alice"), past).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    let ok = h.engine.create_bill(&addr("alice"), bill(100, None, "inv-ok"));
    assert!(ok.is_ok());
}

#[test]
fn test_outsider_cannot_create_bill() {
    let h = Harness::new();
    let err = h
        .engine
        .create_bill(&addr("carol"), bill(100, None, "inv-1"))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);
    assert!(h.engine.store().is_empty());
}

#[test]
fn test_unverified_party_blocks_creation() {
    let h = Harness::new();
    h.identity.revoke(&addr("bob"), &zone());
    let err = h
        .engine
        .create_bill(&addr("alice"), bill(100, None, "inv-1"))
        .unwrap_err();
    assert!(matches!(err, EngineError::IdentityNotVerified { ref party, .. } if *party == addr("bob")));
}

#[test]
fn test_inactive_jurisdiction_blocks_creation() {
    let h = Harness::new();
    h.jurisdictions.deactivate(&zone());
    let err = h
        .engine
        .create_bill(&addr("alice"), bill(100, None, "inv-1"))
        .unwrap_err();
    assert!(matches!(err, EngineError::JurisdictionInactive(_)));
    assert_eq!(err.category(), ErrorCategory::Compliance);
}

#[test]
fn test_gate_rejection_leaves_no_trace() {
    let h = Harness::new();
    let gate = RulebookGate::new();
    gate.add_rule(zone(), Box::new(AmountCeiling { max: 1_000 }));
    h.engine
        .set_compliance_gate(&addr("ops"), Arc::new(gate))
        .unwrap();

    assert!(h.engine.list_by_party(&addr("alice")).is_empty());
    let err = h
        .engine
        .create_bill(&addr("alice"), bill(5_000, None, "inv-big"))
        .unwrap_err();
    match &err {
        EngineError::ComplianceRejected { reason, operation, .. } => {
            assert_eq!(reason, "amount_ceiling");
            assert_eq!(operation, "bill.create");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.engine.list_by_party(&addr("alice")).is_empty());
    assert!(h.engine.list_by_party(&addr("bob")).is_empty());
    assert!(h.engine.events().is_empty());

    let id = h
        .engine
        .create_bill(&addr("alice"), bill(900, None, "inv-small"))
        .unwrap();
    assert_eq!(h.engine.list_by_party(&addr("bob"))[0].id, id);
}

#[test]
fn test_documents_are_linked_at_creation() {
    let h = Harness::new();
    let docs = vec![DocumentId::new(), DocumentId::new()];
    let mut new = bill(100, None, "inv-docs");
    new.documents = docs.clone();
    let id = h.engine.create_bill(&addr("alice"), new).unwrap();

    assert_eq!(h.documents.documents_for(&id), docs);
    let links = h.engine.list_linked(&id).unwrap();
    assert_eq!(
        links,
        docs.iter().map(|d| RecordLink::Document(*d)).collect::<Vec<_>>()
    );
}

#[test]
fn test_identical_inputs_get_distinct_ids() {
    let h = Harness::new();
    let a = h.engine.create_bill(&addr("alice"), bill(100, None, "same")).unwrap();
    let b = h.engine.create_bill(&addr("alice"), bill(100, None, "same")).unwrap();
    assert_ne!(a, b);
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[test]
fn test_issue_then_overdue_then_pay() {
    let h = Harness::new();
    let id = h.engine.create_bill(&addr("alice"), bill(100, None, "inv-1")).unwrap();

    assert_eq!(h.engine.issue_bill(&id, &addr("bob")).unwrap(), ObligationStatus::Pending);
    let early = h.engine.mark_overdue(&id, &addr("bob")).unwrap_err();
    assert!(matches!(early, EngineError::NotDue { .. }));

    h.advance_to_day(1);
    assert_eq!(h.engine.mark_overdue(&id, &addr("bob")).unwrap(), ObligationStatus::Overdue);
    h.engine.pay_bill(&id, &addr("alice")).unwrap();

    let record = h.engine.get(&id).unwrap();
    assert_eq!(record.status, ObligationStatus::Paid);
    assert_eq!(record.history.len(), 3);
    let actions: Vec<_> = h.engine.events_for(&id).iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, ["create", "issue", "mark_overdue", "pay"]);
}

#[test]
fn test_only_payer_pays() {
    let h = Harness::new();
    let id = h.engine.create_bill(&addr("alice"), bill(100, None, "inv-1")).unwrap();
    let err = h.engine.pay_bill(&id, &addr("bob")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);
    assert!(h.payments.all().is_empty());
}

#[test]
fn test_undefined_edge_leaves_record_untouched() {
    let h = Harness::new();
    let id = h.engine.create_bill(&addr("alice"), bill(100, None, "inv-1")).unwrap();
    h.clock.advance(days(3));
    h.engine.pay_bill(&id, &addr("alice")).unwrap();
    let before = h.engine.get(&id).unwrap();

    h.clock.advance(days(3));
    let err = h.engine.cancel_bill(&id, &addr("alice")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert!(err.is_retryable());
    let again = h.engine.pay_bill(&id, &addr("alice")).unwrap_err();
    assert_eq!(again.category(), ErrorCategory::State);

    let after = h.engine.get(&id).unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(h.payments.all().len(), 1);
}

// ---------------------------------------------------------------------------
// Payment and renewal
// ---------------------------------------------------------------------------

#[test]
fn test_recurring_bill_end_to_end() {
    let h = Harness::new();
    let id = h
        .engine
        .create_bill(&addr("alice"), bill(100, Some(days(30)), "rent"))
        .unwrap();

    // Bills are payable as soon as they exist.
    let paid = h.engine.pay_bill(&id, &addr("alice")).unwrap();

    let parent = h.engine.get(&id).unwrap();
    assert_eq!(parent.status, ObligationStatus::Paid);
    let parent_terms = parent.terms.as_bill().unwrap();
    assert_eq!(parent_terms.recurrence.unwrap().next_cycle, None);

    let successor_id = paid.successor.expect("recurring bill renews");
    assert!(parent.linked_records.contains(&RecordLink::Successor(successor_id)));
    assert!(parent.linked_records.contains(&RecordLink::Payment(paid.payment)));

    let successor = h.engine.get(&successor_id).unwrap();
    assert_eq!(successor.status, ObligationStatus::Created);
    assert_eq!(successor.linked_records, vec![RecordLink::Parent(id)]);
    let terms = successor.terms.as_bill().unwrap();
    assert_eq!(terms.due_date, at_day(31));
    assert_eq!(terms.recurrence.unwrap().next_cycle, Some(at_day(61)));
    assert_eq!(terms.amount, Amount::new(100));
    assert_eq!(successor.parties, parent.parties);
    assert_eq!(successor.jurisdiction, parent.jurisdiction);

    let payment = h.engine.payment(&paid.payment).unwrap();
    assert_eq!(payment.request.amount, Amount::new(100));
    assert_eq!(payment.request.payer, addr("alice"));
    assert_eq!(payment.request.payee, addr("bob"));
    assert_eq!(payment.request.obligation, id);

    let alice: Vec<_> = h.engine.list_by_party(&addr("alice")).into_iter().map(|o| o.id).collect();
    assert_eq!(alice, vec![id, successor_id]);
}

#[test]
fn test_one_off_bill_has_no_successor() {
    let h = Harness::new();
    let id = h.engine.create_bill(&addr("alice"), bill(100, None, "inv-1")).unwrap();
    let paid = h.engine.pay_bill(&id, &addr("alice")).unwrap();
    assert_eq!(paid.successor, None);
    assert_eq!(h.engine.store().len(), 1);
}

#[test]
fn test_declined_payment_aborts_renewal() {
    let h = Harness::new();
    let id = h
        .engine
        .create_bill(&addr("alice"), bill(100, Some(days(30)), "rent"))
        .unwrap();
    h.payments.decline_payer(addr("alice"));

    let err = h.engine.pay_bill(&id, &addr("alice")).unwrap_err();
    assert!(matches!(err, EngineError::PaymentFailed(_)));
    assert_eq!(err.category(), ErrorCategory::Dependency);

    let record = h.engine.get(&id).unwrap();
    assert_eq!(record.status, ObligationStatus::Created);
    assert!(record.linked_records.is_empty());
    assert_eq!(
        record.terms.as_bill().unwrap().recurrence.unwrap().next_cycle,
        Some(at_day(31))
    );
    assert_eq!(h.engine.store().len(), 1);
    assert_eq!(h.engine.events().len(), 1);

    h.payments.accept_payer(&addr("alice"));
    assert!(h.engine.pay_bill(&id, &addr("alice")).unwrap().successor.is_some());
}

fn renewal_due_dates(n: u64, interval_days: u64) -> Vec<Timestamp> {
    let h = Harness::new();
    let mut id = h
        .engine
        .create_bill(&addr("alice"), bill(100, Some(days(interval_days)), "sub"))
        .unwrap();
    let mut dues = Vec::new();
    for _ in 0..n {
        let paid = h.engine.pay_bill(&id, &addr("alice")).unwrap();
        id = paid.successor.unwrap();
        dues.push(h.engine.get(&id).unwrap().terms.as_bill().unwrap().due_date);
    }
    dues
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_successive_renewals_advance_one_interval_each(n in 1u64..8, interval_days in 1u64..90) {
        let dues = renewal_due_dates(n, interval_days);
        let first = at_day(1).epoch_secs();
        for (k, due) in dues.iter().enumerate() {
            let expected = first + (k as i64 + 1) * (interval_days as i64) * 86_400;
            prop_assert_eq!(due.epoch_secs(), expected);
        }
    }
}
