//! Shared fixture: an engine wired to in-memory collaborators and a
//! manual clock, with a handful of verified parties.

#![allow(dead_code)]

use std::sync::Arc;

use covenant_compliance::{
    InMemoryIdentityService, PermissiveGate, StaticJurisdictionRegistry, VerificationLevel,
};
use covenant_core::{Amount, Interval, JurisdictionCode, ManualClock, PartyAddress, Timestamp};
use covenant_engine::{
    EngineConfig, InMemoryDocumentRegistry, InMemoryItemRegistry, InMemoryPaymentProcessor,
    NewBill, ObligationEngine, PolicySource, Services,
};
use covenant_state::PaymentMethod;

pub const START: &str = "2026-01-01T00:00:00Z";
pub const ZONE: &str = "pk-sez";
pub const VERIFIED: [&str; 8] = ["alice", "bob", "carol", "dave", "acme", "vera", "ops", "erin"];

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub engine: ObligationEngine,
    pub jurisdictions: Arc<StaticJurisdictionRegistry>,
    pub identity: Arc<InMemoryIdentityService>,
    pub payments: Arc<InMemoryPaymentProcessor>,
    pub documents: Arc<InMemoryDocumentRegistry>,
    pub items: Arc<InMemoryItemRegistry>,
}

pub fn addr(s: &str) -> PartyAddress {
    PartyAddress::new(s).unwrap()
}

pub fn zone() -> JurisdictionCode {
    JurisdictionCode::new(ZONE).unwrap()
}

pub fn start() -> Timestamp {
    Timestamp::parse(START).unwrap()
}

pub fn days(n: u64) -> Interval {
    Interval::from_days(n).unwrap()
}

pub fn at_day(n: u64) -> Timestamp {
    start().checked_add(days(n)).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let jurisdictions = Arc::new(StaticJurisdictionRegistry::with_active([zone()]));
        let identity = Arc::new(InMemoryIdentityService::new());
        for name in VERIFIED {
            identity.verify(addr(name), zone(), VerificationLevel::Basic);
        }
        let payments = Arc::new(InMemoryPaymentProcessor::new());
        let documents = Arc::new(InMemoryDocumentRegistry::new());
        let items = Arc::new(InMemoryItemRegistry::new());
        let services = Services {
            gate: Arc::new(PermissiveGate),
            jurisdictions: jurisdictions.clone(),
            identity: identity.clone(),
            payments: payments.clone(),
            documents: documents.clone(),
            policies: PolicySource::Local,
            items: items.clone(),
        };
        let engine = ObligationEngine::new(addr("ops"), config, clock.clone(), services);
        Self {
            clock,
            engine,
            jurisdictions,
            identity,
            payments,
            documents,
            items,
        }
    }

    pub fn advance_to_day(&self, n: u64) {
        self.clock.advance_to(at_day(n));
    }
}

/// Alice owes Bob `amount`, due on day 1.
pub fn bill(amount: u64, interval: Option<Interval>, reference: &str) -> NewBill {
    NewBill {
        payer: addr("alice"),
        payee: addr("bob"),
        amount: Amount::new(amount),
        due_date: at_day(1),
        method: PaymentMethod::BankTransfer,
        method_data: "iban:PK00TEST".to_string(),
        description: "consulting".to_string(),
        interval,
        reference: reference.to_string(),
        jurisdiction: zone(),
        documents: Vec::new(),
    }
}
