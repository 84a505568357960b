//! # Compliance Gate
//!
//! `evaluate(jurisdiction, operation, payload) -> (allowed, reason)`.
//!
//! The gate is a synchronous predicate. The engine calls it once per
//! creation with the canonical bytes of the creation intent and aborts the
//! whole operation on a denial.

use std::fmt;

use serde::{Deserialize, Serialize};

use covenant_core::JurisdictionCode;

use crate::error::ComplianceError;

/// `<kind>.<operation>`, e.g. `bill.create`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationTag(String);

impl OperationTag {
    /// Build a tag from its two halves.
    pub fn new(kind: &str, operation: &str) -> Self {
        Self(format!("{kind}.{operation}"))
    }

    /// Parse `<kind>.<operation>`.
    ///
    /// # Errors
    ///
    /// [`ComplianceError::MalformedTag`] unless both halves are non-empty.
    pub fn parse(s: &str) -> Result<Self, ComplianceError> {
        match s.split_once('.') {
            Some((k, op)) if !k.is_empty() && !op.is_empty() && !op.contains('.') => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ComplianceError::MalformedTag(s.to_string())),
        }
    }

    /// The full tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the dot.
    pub fn kind(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(k, _)| k)
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OperationTag {
    type Error = ComplianceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OperationTag> for String {
    fn from(tag: OperationTag) -> Self {
        tag.0
    }
}

/// Machine-readable reason attached to a decision (e.g. `amount_ceiling`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonCode(pub String);

impl ReasonCode {
    /// Reason carried by an unconditional allow.
    pub fn ok() -> Self {
        Self("ok".to_string())
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// Why.
    pub reason: ReasonCode,
}

impl GateDecision {
    /// Allow with the given reason.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: ReasonCode(reason.into()),
        }
    }

    /// Deny with the given reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: ReasonCode(reason.into()),
        }
    }
}

/// The compliance predicate consulted before any obligation is created.
pub trait ComplianceGate: Send + Sync {
    /// Evaluate `operation` in `jurisdiction` against the canonical
    /// `payload` bytes of the intent.
    fn evaluate(
        &self,
        jurisdiction: &JurisdictionCode,
        operation: &OperationTag,
        payload: &[u8],
    ) -> GateDecision;
}

/// Allows everything. Useful for hosts without a rulebook and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveGate;

impl ComplianceGate for PermissiveGate {
    fn evaluate(&self, _: &JurisdictionCode, _: &OperationTag, _: &[u8]) -> GateDecision {
        GateDecision::allow(ReasonCode::ok().0)
    }
}
