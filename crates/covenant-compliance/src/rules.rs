//! # Rule-Based Gate
//!
//! [`RulebookGate`] holds an ordered list of [`RuleEvaluator`]s per
//! jurisdiction. On each call it decodes the canonical JSON payload, runs
//! every rule of the jurisdiction, and folds the verdicts with
//! [`ComplianceState::meet`]. The operation is allowed only if the result
//! is passing; the reason is taken from the first rule that produced the
//! blocking state.
//!
//! A payload that is not valid JSON is denied with `malformed_payload`.
//! A jurisdiction without rules evaluates to `NotApplicable` and passes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use covenant_core::JurisdictionCode;

use crate::gate::{ComplianceGate, GateDecision, OperationTag};
use crate::state::ComplianceState;

/// What a rule sees.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Jurisdiction the operation runs in.
    pub jurisdiction: JurisdictionCode,
    /// Operation tag.
    pub operation: OperationTag,
    /// Decoded intent payload.
    pub payload: Value,
}

/// One compliance rule.
pub trait RuleEvaluator: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Verdict with an optional reason code.
    fn evaluate(&self, ctx: &EvaluationContext) -> (ComplianceState, Option<String>);
}

// ── Built-in rules ───────────────────────────────────────────────────

/// Payload fields treated as monetary amounts.
const AMOUNT_FIELDS: [&str; 4] = ["amount", "coverage", "premium", "fee"];

/// Rejects intents whose amount fields exceed a ceiling (minor units).
#[derive(Debug, Clone)]
pub struct AmountCeiling {
    /// Largest accepted value.
    pub max: u64,
}

impl RuleEvaluator for AmountCeiling {
    fn name(&self) -> &str {
        "amount_ceiling"
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> (ComplianceState, Option<String>) {
        // Creation intents nest the kind-specific fields under `terms`.
        let scopes = [Some(&ctx.payload), ctx.payload.get("terms")];
        let amounts: Vec<u64> = scopes
            .iter()
            .flatten()
            .flat_map(|scope| AMOUNT_FIELDS.iter().filter_map(|f| scope.get(*f)))
            .filter_map(Value::as_u64)
            .collect();
        if amounts.is_empty() {
            return (ComplianceState::NotApplicable, None);
        }
        if amounts.iter().any(|a| *a > self.max) {
            (ComplianceState::NonCompliant, Some("amount_ceiling".into()))
        } else {
            (ComplianceState::Compliant, None)
        }
    }
}

/// Rejects intents that mention a sanctioned address anywhere in the
/// payload.
#[derive(Debug, Clone, Default)]
pub struct SanctionsList {
    /// Blocked addresses.
    pub addresses: BTreeSet<String>,
}

impl SanctionsList {
    fn mentions(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.addresses.contains(s),
            Value::Array(items) => items.iter().any(|v| self.mentions(v)),
            Value::Object(map) => map.values().any(|v| self.mentions(v)),
            _ => false,
        }
    }
}

impl RuleEvaluator for SanctionsList {
    fn name(&self) -> &str {
        "sanctions"
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> (ComplianceState, Option<String>) {
        if self.mentions(&ctx.payload) {
            (ComplianceState::NonCompliant, Some("sanctioned_party".into()))
        } else {
            (ComplianceState::Compliant, None)
        }
    }
}

/// Permits only the listed operation tags.
#[derive(Debug, Clone, Default)]
pub struct OperationAllowlist {
    /// Accepted tags, e.g. `bill.create`.
    pub operations: BTreeSet<String>,
}

impl RuleEvaluator for OperationAllowlist {
    fn name(&self) -> &str {
        "operation_allowlist"
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> (ComplianceState, Option<String>) {
        if self.operations.contains(ctx.operation.as_str()) {
            (ComplianceState::Compliant, None)
        } else {
            (
                ComplianceState::NonCompliant,
                Some("operation_not_permitted".into()),
            )
        }
    }
}

/// Declarative form of the built-in rules, for configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    /// See [`AmountCeiling`].
    AmountCeiling {
        /// Largest accepted value.
        max: u64,
    },
    /// See [`SanctionsList`].
    Sanctions {
        /// Blocked addresses.
        addresses: BTreeSet<String>,
    },
    /// See [`OperationAllowlist`].
    AllowOperations {
        /// Accepted tags.
        operations: BTreeSet<String>,
    },
}

impl RuleSpec {
    /// Instantiate the rule.
    pub fn build(&self) -> Box<dyn RuleEvaluator> {
        match self {
            Self::AmountCeiling { max } => Box::new(AmountCeiling { max: *max }),
            Self::Sanctions { addresses } => Box::new(SanctionsList {
                addresses: addresses.clone(),
            }),
            Self::AllowOperations { operations } => Box::new(OperationAllowlist {
                operations: operations.clone(),
            }),
        }
    }
}

// ── Gate ─────────────────────────────────────────────────────────────

/// Per-jurisdiction rulebooks behind the [`ComplianceGate`] contract.
#[derive(Debug, Default)]
pub struct RulebookGate {
    books: RwLock<HashMap<JurisdictionCode, Vec<Box<dyn RuleEvaluator>>>>,
}

impl RulebookGate {
    /// A gate with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declarative specs.
    pub fn from_specs<'a>(
        specs: impl IntoIterator<Item = (&'a JurisdictionCode, &'a Vec<RuleSpec>)>,
    ) -> Self {
        let gate = Self::new();
        for (code, rules) in specs {
            for r in rules {
                gate.add_rule(code.clone(), r.build());
            }
        }
        gate
    }

    /// Append a rule to `jurisdiction`'s rulebook.
    pub fn add_rule(&self, jurisdiction: JurisdictionCode, rule: Box<dyn RuleEvaluator>) {
        self.books.write().entry(jurisdiction).or_default().push(rule);
    }

    /// Combined verdict and the first blocking reason, if any.
    pub fn assess(&self, ctx: &EvaluationContext) -> (ComplianceState, Option<String>) {
        let books = self.books.read();
        let Some(rules) = books.get(&ctx.jurisdiction) else {
            return (ComplianceState::NotApplicable, None);
        };
        let mut combined = ComplianceState::Compliant;
        let mut reason: Option<String> = None;
        for rule in rules {
            let (state, why) = rule.evaluate(ctx);
            tracing::trace!(rule = rule.name(), state = %state, "rule evaluated");
            if state < combined {
                combined = combined.meet(state);
                reason = why.or_else(|| Some(rule.name().to_string()));
            }
        }
        (combined, reason)
    }
}

impl ComplianceGate for RulebookGate {
    fn evaluate(
        &self,
        jurisdiction: &JurisdictionCode,
        operation: &OperationTag,
        payload: &[u8],
    ) -> GateDecision {
        let payload: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(jurisdiction = %jurisdiction, operation = %operation, error = %e, "undecodable compliance payload");
                return GateDecision::deny("malformed_payload");
            }
        };
        let ctx = EvaluationContext {
            jurisdiction: jurisdiction.clone(),
            operation: operation.clone(),
            payload,
        };
        let (state, reason) = self.assess(&ctx);
        if state.is_passing() {
            GateDecision::allow(state.to_string())
        } else {
            let reason = reason.unwrap_or_else(|| state.to_string());
            tracing::warn!(jurisdiction = %jurisdiction, operation = %operation, reason = %reason, "compliance gate denied");
            GateDecision::deny(reason)
        }
    }
}
