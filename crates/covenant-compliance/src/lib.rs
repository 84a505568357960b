//! # covenant-compliance — Creation-Time Gating Collaborators
//!
//! The engine consults three collaborators before it persists a new
//! obligation:
//!
//! - [`JurisdictionRegistry`]: is the jurisdiction accepting business?
//! - [`IdentityService`]: is every party verified for that jurisdiction?
//! - [`ComplianceGate`]: does the jurisdiction's rulebook allow this
//!   operation with this payload?
//!
//! Each is a trait so hosts can plug in their own service. The crate also
//! ships in-process implementations: a static registry, an in-memory
//! identity store, and [`RulebookGate`], which evaluates per-jurisdiction
//! rules and combines their verdicts with the [`ComplianceState`] lattice.

pub mod error;
pub mod gate;
pub mod identity;
pub mod registry;
pub mod rules;
pub mod state;

pub use error::ComplianceError;
pub use gate::{ComplianceGate, GateDecision, OperationTag, PermissiveGate, ReasonCode};
pub use identity::{IdentityService, InMemoryIdentityService, VerificationLevel};
pub use registry::{JurisdictionRegistry, StaticJurisdictionRegistry};
pub use rules::{
    AmountCeiling, EvaluationContext, OperationAllowlist, RuleEvaluator, RuleSpec, RulebookGate,
    SanctionsList,
};
pub use state::ComplianceState;
