//! # Cross-Record Tests
//!
//! Claims resolve their policy and verifications resolve their item on
//! every operation that depends on them. The policy may live in this
//! engine or in a sibling one.

mod common;

use std::sync::Arc;

use common::*;
use covenant_compliance::PermissiveGate;
use covenant_core::{Amount, ItemId, ObligationId};
use covenant_engine::{
    ClaimDecision, EngineConfig, EngineError, ErrorCategory, InMemoryItemRegistry, ItemRecord,
    NewClaim, NewPolicy, NewVerification, ObligationEngine, PolicyRecord, PolicySource,
    RecordSource, Services,
};
use covenant_state::{ObligationStatus, RecordLink};

fn policy() -> NewPolicy {
    NewPolicy {
        beneficiary: addr("alice"),
        policy_type: "property".to_string(),
        coverage: Amount::new(1_000),
        premium: Amount::new(50),
        start: at_day(1),
        end: at_day(365),
        reference: "pol-1".to_string(),
        jurisdiction: zone(),
        documents: Vec::new(),
    }
}

fn claim(policy: ObligationId, amount: u64) -> NewClaim {
    NewClaim {
        policy,
        amount: Amount::new(amount),
        description: "storm damage".to_string(),
        reference: "clm-1".to_string(),
        documents: Vec::new(),
    }
}

fn active_policy(h: &Harness) -> ObligationId {
    let id = h.engine.create_policy(&addr("acme"), policy()).unwrap();
    assert_eq!(
        h.engine.activate_policy(&id, &addr("acme")).unwrap(),
        ObligationStatus::Active
    );
    id
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[test]
fn test_policy_dates_are_validated() {
    let h = Harness::new();
    let mut inverted = policy();
    inverted.end = at_day(1);
    assert_eq!(
        h.engine.create_policy(&addr("acme"), inverted).unwrap_err().category(),
        ErrorCategory::Validation
    );
    let mut immediate = policy();
    immediate.start = start();
    assert!(h.engine.create_policy(&addr("acme"), immediate).is_err());
}

#[test]
fn test_policy_expiry_waits_for_end_date() {
    let h = Harness::new();
    let id = active_policy(&h);
    h.advance_to_day(365);
    assert!(matches!(
        h.engine.expire_policy(&id, &addr("acme")),
        Err(EngineError::NotDue { .. })
    ));
    h.advance_to_day(366);
    assert!(h.engine.expire_policy(&id, &addr("alice")).is_err());
    assert_eq!(
        h.engine.expire_policy(&id, &addr("acme")).unwrap(),
        ObligationStatus::Expired
    );
}

#[test]
fn test_beneficiary_may_cancel_active_policy() {
    let h = Harness::new();
    let id = h.engine.create_policy(&addr("acme"), policy()).unwrap();
    assert!(h.engine.cancel_policy(&id, &addr("alice")).is_err());
    h.engine.activate_policy(&id, &addr("acme")).unwrap();
    assert_eq!(
        h.engine.cancel_policy(&id, &addr("alice")).unwrap(),
        ObligationStatus::Cancelled
    );
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[test]
fn test_claim_lifecycle() {
    let h = Harness::new();
    let policy_id = active_policy(&h);
    let id = h.engine.submit_claim(&addr("alice"), claim(policy_id, 400)).unwrap();

    let record = h.engine.get(&id).unwrap();
    assert_eq!(record.status, ObligationStatus::Submitted);
    assert_eq!(record.jurisdiction, zone());
    assert!(record.linked_records.contains(&RecordLink::Policy(policy_id)));

    let err = h
        .engine
        .review_claim(&id, &addr("bob"), ClaimDecision::StartReview)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);

    assert_eq!(
        h.engine.review_claim(&id, &addr("acme"), ClaimDecision::StartReview).unwrap(),
        ObligationStatus::UnderReview
    );
    assert!(matches!(
        h.engine.review_claim(&id, &addr("acme"), ClaimDecision::StartReview),
        Err(EngineError::InvalidTransition { .. })
    ));
    assert_eq!(
        h.engine.review_claim(&id, &addr("acme"), ClaimDecision::Approve).unwrap(),
        ObligationStatus::Approved
    );

    let payment = h.engine.pay_claim(&id, &addr("acme")).unwrap();
    let paid = h.engine.payment(&payment).unwrap();
    assert_eq!(paid.request.payer, addr("acme"));
    assert_eq!(paid.request.payee, addr("alice"));
    assert_eq!(paid.request.amount, Amount::new(400));
    assert_eq!(h.engine.get(&id).unwrap().status, ObligationStatus::Paid);
}

#[test]
fn test_rejection_requires_reason_and_can_be_disputed() {
    let h = Harness::new();
    let policy_id = active_policy(&h);
    let id = h.engine.submit_claim(&addr("alice"), claim(policy_id, 100)).unwrap();

    let blank = h
        .engine
        .review_claim(&id, &addr("acme"), ClaimDecision::Reject { reason: "  ".into() })
        .unwrap_err();
    assert!(matches!(blank, EngineError::InvalidInput { .. }));
    assert_eq!(h.engine.get(&id).unwrap().status, ObligationStatus::Submitted);

    h.engine
        .review_claim(&id, &addr("acme"), ClaimDecision::Reject { reason: "pre-existing damage".into() })
        .unwrap();
    let record = h.engine.get(&id).unwrap();
    assert_eq!(
        record.terms.as_claim().unwrap().rejection_reason.as_deref(),
        Some("pre-existing damage")
    );

    assert!(h.engine.dispute_claim(&id, &addr("acme")).is_err());
    assert_eq!(
        h.engine.dispute_claim(&id, &addr("alice")).unwrap(),
        ObligationStatus::Disputed
    );
}

#[test]
fn test_claim_preconditions() {
    let h = Harness::new();
    let pending = h.engine.create_policy(&addr("acme"), policy()).unwrap();
    assert!(matches!(
        h.engine.submit_claim(&addr("alice"), claim(pending, 100)),
        Err(EngineError::PrerequisiteStatus { .. })
    ));

    h.engine.activate_policy(&pending, &addr("acme")).unwrap();
    assert_eq!(
        h.engine.submit_claim(&addr("bob"), claim(pending, 100)).unwrap_err().category(),
        ErrorCategory::Authorization
    );
    assert!(matches!(
        h.engine.submit_claim(&addr("alice"), claim(pending, 1_001)),
        Err(EngineError::InvalidInput { .. })
    ));

    let bill_id = h.engine.create_bill(&addr("alice"), bill(100, None, "inv")).unwrap();
    assert!(matches!(
        h.engine.submit_claim(&addr("alice"), claim(bill_id, 100)),
        Err(EngineError::Resolution { kind: "policy", .. })
    ));
}

#[test]
fn test_claim_against_policy_held_by_sibling_engine() {
    let insurer_side = Harness::new();
    let policy_id = active_policy(&insurer_side);

    let claims_side = Harness::new();
    let err = claims_side
        .engine
        .submit_claim(&addr("alice"), claim(policy_id, 100))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Dependency);

    let source: Arc<dyn RecordSource<PolicyRecord>> = Arc::new(insurer_side.engine.store().clone());
    assert!(claims_side
        .engine
        .set_policy_source(&addr("alice"), PolicySource::External(source.clone()))
        .is_err());
    claims_side
        .engine
        .set_policy_source(&addr("ops"), PolicySource::External(source))
        .unwrap();

    let id = claims_side
        .engine
        .submit_claim(&addr("alice"), claim(policy_id, 100))
        .unwrap();
    assert_eq!(claims_side.engine.resolve_policy(&policy_id).unwrap().insurer, addr("acme"));
    assert_eq!(
        claims_side
            .engine
            .review_claim(&id, &addr("acme"), ClaimDecision::Approve)
            .unwrap(),
        ObligationStatus::Approved
    );
}

#[test]
fn test_claim_after_end_of_cover_is_refused() {
    let h = Harness::new();
    let policy_id = active_policy(&h);
    h.advance_to_day(365);
    assert!(h.engine.submit_claim(&addr("alice"), claim(policy_id, 100)).is_ok());

    h.advance_to_day(400);
    let mut late = claim(policy_id, 100);
    late.reference = "clm-2".to_string();
    let err = h.engine.submit_claim(&addr("alice"), late).unwrap_err();
    assert!(matches!(err, EngineError::CoverEnded { policy, .. } if policy == policy_id));
    assert_eq!(err.category(), ErrorCategory::State);
    assert_eq!(h.engine.list_by_party(&addr("alice")).len(), 2);
}

#[test]
fn test_own_store_is_refused_as_policy_source() {
    let h = Harness::new();
    let own: Arc<dyn RecordSource<PolicyRecord>> = Arc::new(h.engine.store().clone());
    let err = h
        .engine
        .set_policy_source(&addr("ops"), PolicySource::External(own.clone()))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput { .. }));

    let twin = ObligationEngine::with_store(
        addr("ops"),
        EngineConfig::default(),
        h.clock.clone(),
        services_over(&h, PolicySource::Local),
        h.engine.store().clone(),
    );
    assert!(twin
        .set_policy_source(&addr("ops"), PolicySource::External(own))
        .is_err());
}

#[test]
fn test_shared_store_source_fails_instead_of_blocking() {
    let h = Harness::new();
    let policy_id = active_policy(&h);
    let store = h.engine.store().clone();
    let twin = ObligationEngine::with_store(
        addr("ops"),
        EngineConfig::default(),
        h.clock.clone(),
        services_over(&h, PolicySource::External(Arc::new(store.clone()))),
        store,
    );
    let err = twin
        .submit_claim(&addr("alice"), claim(policy_id, 100))
        .unwrap_err();
    assert!(matches!(err, EngineError::Resolution { kind: "policy", .. }));
    assert_eq!(h.engine.list_by_party(&addr("alice")).len(), 1);
}

fn services_over(h: &Harness, policies: PolicySource) -> Services {
    Services {
        gate: Arc::new(PermissiveGate),
        jurisdictions: h.jurisdictions.clone(),
        identity: h.identity.clone(),
        payments: h.payments.clone(),
        documents: h.documents.clone(),
        policies,
        items: h.items.clone(),
    }
}

#[derive(Debug)]
struct Misaddressed(PolicyRecord);

impl RecordSource<PolicyRecord> for Misaddressed {
    fn fetch(&self, _id: &ObligationId) -> Option<PolicyRecord> {
        Some(self.0.clone())
    }
}

#[test]
fn test_mismatched_policy_aborts_review() {
    let h = Harness::new();
    let policy_id = active_policy(&h);
    let id = h.engine.submit_claim(&addr("alice"), claim(policy_id, 100)).unwrap();

    let mut other = policy();
    other.reference = "pol-2".to_string();
    let other_id = h.engine.create_policy(&addr("acme"), other).unwrap();
    let wrong = h.engine.resolve_policy(&other_id).unwrap();
    h.engine
        .set_policy_source(&addr("ops"), PolicySource::External(Arc::new(Misaddressed(wrong))))
        .unwrap();

    let err = h
        .engine
        .review_claim(&id, &addr("acme"), ClaimDecision::StartReview)
        .unwrap_err();
    assert!(matches!(err, EngineError::Resolution { .. }));
    assert_eq!(h.engine.get(&id).unwrap().status, ObligationStatus::Submitted);
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

fn item(owner: &str) -> ItemRecord {
    ItemRecord {
        id: ItemId::new("sku-001").unwrap(),
        owner: addr(owner),
        description: "container of tea".to_string(),
    }
}

fn verification(fee: u64) -> NewVerification {
    NewVerification {
        verifier: addr("vera"),
        item: ItemId::new("sku-001").unwrap(),
        fee: Amount::new(fee),
        reference: "ver-1".to_string(),
        jurisdiction: zone(),
        documents: Vec::new(),
    }
}

#[test]
fn test_only_item_owner_requests_verification() {
    let h = Harness::new();
    h.items.register(item("alice"));
    let err = h
        .engine
        .request_verification(&addr("bob"), verification(25))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);

    let id = h.engine.request_verification(&addr("alice"), verification(25)).unwrap();
    let record = h.engine.get(&id).unwrap();
    assert_eq!(record.status, ObligationStatus::Requested);
    assert!(record
        .linked_records
        .contains(&RecordLink::Item(ItemId::new("sku-001").unwrap())));
}

#[test]
fn test_approval_pays_the_fee() {
    let h = Harness::new();
    h.items.register(item("alice"));
    let id = h.engine.request_verification(&addr("alice"), verification(25)).unwrap();

    assert!(h.engine.decide_verification(&id, &addr("alice"), true, String::new()).is_err());
    let outcome = h
        .engine
        .decide_verification(&id, &addr("vera"), true, "seal intact".to_string())
        .unwrap();
    assert_eq!(outcome.status, ObligationStatus::Verified);
    let payment = h.engine.payment(&outcome.payment.unwrap()).unwrap();
    assert_eq!(payment.request.payer, addr("alice"));
    assert_eq!(payment.request.payee, addr("vera"));
    assert_eq!(
        h.engine.get(&id).unwrap().terms.as_verification().unwrap().findings.as_deref(),
        Some("seal intact")
    );
}

#[test]
fn test_rejection_needs_findings_and_pays_nothing() {
    let h = Harness::new();
    h.items.register(item("alice"));
    let id = h.engine.request_verification(&addr("alice"), verification(25)).unwrap();
    assert!(matches!(
        h.engine.decide_verification(&id, &addr("vera"), false, String::new()),
        Err(EngineError::InvalidInput { .. })
    ));
    let outcome = h
        .engine
        .decide_verification(&id, &addr("vera"), false, "counterfeit".to_string())
        .unwrap();
    assert_eq!(outcome.status, ObligationStatus::Rejected);
    assert_eq!(outcome.payment, None);
    assert!(h.payments.all().is_empty());
}

#[test]
fn test_vanished_item_aborts_decision() {
    let h = Harness::new();
    h.items.register(item("alice"));
    let id = h.engine.request_verification(&addr("alice"), verification(0)).unwrap();
    h.engine
        .set_item_source(&addr("ops"), Arc::new(InMemoryItemRegistry::new()))
        .unwrap();
    let err = h
        .engine
        .decide_verification(&id, &addr("vera"), true, String::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Resolution { kind: "item", .. }));
    assert_eq!(h.engine.get(&id).unwrap().status, ObligationStatus::Requested);
}
