#![deny(missing_docs)]

//! # covenant-core — Foundational Types for the Obligation Engine
//!
//! This crate defines the primitives every other crate in the workspace
//! depends on. It has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`ObligationId`],
//!    [`PartyAddress`], [`JurisdictionCode`], [`PaymentId`] and friends are
//!    distinct types. You cannot pass a payment id where an obligation id is
//!    expected.
//!
//! 2. **[`CanonicalBytes`] is the sole path to digest computation.** Obligation
//!    ids and compliance payloads are derived from RFC 8785 canonical JSON, so
//!    two nodes hashing the same intent always agree.
//!
//! 3. **Ledger time, not wall time.** Every guard compares against a
//!    [`Clock`]; tests drive a [`ManualClock`], production uses [`SystemClock`].
//!
//! 4. **Structured errors.** [`ValidationError`] and [`CanonicalizationError`]
//!    are `thiserror` enums carrying the offending input.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod jurisdiction;
pub mod money;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{DocumentId, ItemId, ObligationId, PartyAddress, PaymentId, TemplateId};
pub use jurisdiction::JurisdictionCode;
pub use money::Amount;
pub use temporal::{Clock, Interval, ManualClock, SystemClock, Timestamp};
