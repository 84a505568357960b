//! # covenant-engine — Obligation Lifecycle Engine
//!
//! One engine hosts every obligation kind: bills, subscriptions, insurance
//! policies and claims, multi-party contracts, and supply-chain
//! verifications. It owns the entity store and drives every record through
//! the lifecycle table defined in `covenant-state`.
//!
//! ## Operation model
//!
//! Each mutating call runs as one store transaction:
//!
//! 1. Load the record (or validate the new one).
//! 2. Guard against the lifecycle table: role first, then status.
//! 3. Operation-specific checks: due dates, coverage, signatures,
//!    cross-record resolution.
//! 4. Side effects that may fail: renewal staging, then payment dispatch.
//! 5. Apply the edge, stage the event, commit.
//!
//! A failure at any step discards the transaction. Readers never see a
//! half-applied operation.
//!
//! Creation additionally checks jurisdiction activity, party identity, and
//! the compliance gate. Later transitions do not consult the gate.
//!
//! ## Collaborators
//!
//! Compliance gate, jurisdiction registry, identity service, payment
//! processor, document registry, policy source, and item source are all
//! trait objects held in [`Services`]. Only the engine administrator can
//! replace them.

pub mod admin;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod events;
pub mod items;
pub mod ops;
pub mod payments;
pub mod renewal;
pub mod resolver;
pub mod signing;
pub mod store;
pub mod templates;

pub use admin::{Administrator, Services};
pub use config::{ConfigError, EngineConfig};
pub use documents::{DocumentError, DocumentRegistry, InMemoryDocumentRegistry};
pub use engine::{derive_id, ObligationEngine};
pub use error::{EngineError, ErrorCategory};
pub use events::ObligationEvent;
pub use items::{InMemoryItemRegistry, ItemRecord};
pub use ops::bill::{BillPayment, NewBill};
pub use ops::contract::NewContract;
pub use ops::insurance::{ClaimDecision, NewClaim, NewPolicy};
pub use ops::subscription::{CycleOutcome, NewSubscription};
pub use ops::template::{FromTemplate, NewTemplate};
pub use ops::verification::{NewVerification, VerificationOutcome};
pub use payments::{
    InMemoryPaymentProcessor, PaymentError, PaymentProcessor, PaymentRecord, PaymentRequest,
};
pub use resolver::{resolve, PolicyRecord, PolicySource, RecordSource, Resolvable};
pub use signing::SignOutcome;
pub use store::{ObligationStore, Transaction};
pub use templates::ContractTemplate;
