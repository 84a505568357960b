//! # covenant-state — Obligation Records and the Lifecycle Table
//!
//! Every application built on the engine (bills, recurring subscriptions,
//! insurance policies and claims, legal contracts, supply-chain
//! verifications) is an instance of one pattern: an obligation that is
//! created, advanced through a bounded set of statuses by authorized
//! parties, and eventually reaches a terminal status.
//!
//! Rather than one hand-written state machine per application, the
//! lifecycle is data: [`table::EDGES`] lists every
//! `(kind, from, action) → (to, roles)` edge, and [`table::guard`] is the
//! single validator all kinds share.
//!
//! ## Modules
//!
//! - **kind**: [`ObligationKind`] and the unified [`ObligationStatus`].
//! - **role**: [`Role`] and [`Party`].
//! - **table**: [`Action`], [`Edge`], and the guard functions.
//! - **terms**: per-kind payloads, opaque to the table.
//! - **obligation**: the [`Obligation`] record and its history.
//! - **signature**: the [`SignatureBook`] for contract-kind obligations.
//!
//! Guard order is fixed: the caller's role is checked before the current
//! status. A rejected guard never mutates the record.

pub mod error;
pub mod kind;
pub mod obligation;
pub mod role;
pub mod signature;
pub mod table;
pub mod terms;

pub use error::{GuardError, SignatureError};
pub use kind::{ObligationKind, ObligationStatus};
pub use obligation::{Obligation, RecordLink, TransitionRecord};
pub use role::{Party, Role};
pub use signature::{Attestation, SignatureBook};
pub use table::{Action, Edge};
pub use terms::{
    BillTerms, ClaimTerms, ContractTerms, PaymentMethod, PolicyTerms, Recurrence,
    SubscriptionTerms, Terms, VerificationTerms,
};
