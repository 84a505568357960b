//! # Run Subcommand
//!
//! Replays a YAML scenario against a fresh in-memory engine driven by a
//! manual clock, then prints every obligation, event, and payment as JSON.
//!
//! A scenario names its obligations with labels (`save: rent`) and later
//! steps refer to them by label (`target: rent`). A step may declare the
//! error category it expects (`expect: state`); any other failure stops the
//! replay.
//!
//! ```yaml
//! start: 2026-01-01T00:00:00Z
//! admin: ops
//! jurisdictions: [pk-sez]
//! identities:
//!   - { address: alice, jurisdiction: pk-sez }
//!   - { address: bob, jurisdiction: pk-sez }
//! steps:
//!   - op: create_bill
//!     actor: alice
//!     save: rent
//!     bill: { payer: alice, payee: bob, amount: 100, due_date: 2026-01-02T00:00:00Z,
//!             interval: 2592000, reference: rent, jurisdiction: pk-sez }
//!   - { op: act, actor: alice, target: rent, action: pay }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use covenant_compliance::{
    ComplianceGate, InMemoryIdentityService, PermissiveGate, RuleSpec, RulebookGate,
    StaticJurisdictionRegistry, VerificationLevel,
};
use covenant_core::{
    Amount, DocumentId, JurisdictionCode, ManualClock, ObligationId, PartyAddress, TemplateId,
    Timestamp,
};
use covenant_engine::{
    ClaimDecision, EngineConfig, EngineError, FromTemplate, InMemoryDocumentRegistry,
    InMemoryItemRegistry, InMemoryPaymentProcessor, ItemRecord, NewBill, NewClaim, NewContract,
    NewPolicy, NewSubscription, NewTemplate, NewVerification, ObligationEngine, ObligationEvent,
    PaymentRecord, PolicySource, Services,
};
use covenant_state::{Action, Obligation, ObligationKind};

/// Arguments for `covenant run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML).
    pub scenario: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pub pretty: bool,
}

// ── Scenario model ───────────────────────────────────────────────────

/// A replayable scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Initial ledger time.
    pub start: Timestamp,
    /// Engine administrator.
    pub admin: PartyAddress,
    /// Engine configuration. Taken from `COVENANT_*` variables when absent.
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    /// Active jurisdictions.
    #[serde(default)]
    pub jurisdictions: Vec<JurisdictionCode>,
    /// Verified identities.
    #[serde(default)]
    pub identities: Vec<IdentityGrant>,
    /// Per-jurisdiction compliance rules. No rules means a permissive gate.
    #[serde(default)]
    pub rules: BTreeMap<JurisdictionCode, Vec<RuleSpec>>,
    /// Registered supply-chain items.
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    /// Payers whose payments the processor declines.
    #[serde(default)]
    pub declined_payers: Vec<PartyAddress>,
    /// Operations, in order.
    pub steps: Vec<StepSpec>,
}

/// One verified identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityGrant {
    /// Verified address.
    pub address: PartyAddress,
    /// Jurisdiction it is verified in.
    pub jurisdiction: JurisdictionCode,
    /// Level reached.
    #[serde(default)]
    pub level: VerificationLevel,
}

/// A step plus its expected outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    /// Error category the step must fail with (`authorization`, `state`,
    /// `validation`, `compliance`, `dependency`).
    #[serde(default)]
    pub expect: Option<String>,
    /// The operation.
    #[serde(flatten)]
    pub step: Step,
}

/// Scenario operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Move the clock forward by `days` plus `seconds`.
    Advance {
        #[serde(default)]
        days: u64,
        #[serde(default)]
        seconds: u64,
    },
    /// Create a bill and save its id under `save`.
    CreateBill {
        actor: PartyAddress,
        save: String,
        bill: NewBill,
    },
    /// Create a subscription; `actor` is the subscriber.
    CreateSubscription {
        actor: PartyAddress,
        save: String,
        subscription: NewSubscription,
    },
    /// Underwrite a policy; `actor` is the insurer.
    CreatePolicy {
        actor: PartyAddress,
        save: String,
        policy: NewPolicy,
    },
    /// Raise a claim against a labelled policy.
    SubmitClaim {
        actor: PartyAddress,
        save: String,
        /// Label of the policy.
        policy: String,
        amount: Amount,
        #[serde(default)]
        description: String,
        reference: String,
        #[serde(default)]
        documents: Vec<DocumentId>,
    },
    /// Draft a contract.
    CreateContract {
        actor: PartyAddress,
        save: String,
        contract: NewContract,
    },
    /// Register a contract template and save its id under `save`.
    RegisterTemplate {
        actor: PartyAddress,
        save: String,
        template: NewTemplate,
    },
    /// Withdraw a template; only its author may.
    DeactivateTemplate {
        actor: PartyAddress,
        /// Label of the template.
        template: String,
    },
    /// Instantiate a contract from a labelled template.
    CreateFromTemplate {
        actor: PartyAddress,
        save: String,
        /// Label of the template.
        template: String,
        signatories: Vec<PartyAddress>,
        title: String,
        reference: String,
    },
    /// Ask a verifier to inspect an item; `actor` must own it.
    RequestVerification {
        actor: PartyAddress,
        save: String,
        verification: NewVerification,
    },
    /// Any lifecycle transition on a labelled obligation.
    Act {
        actor: PartyAddress,
        target: String,
        action: Action,
        /// Claim rejection reason.
        #[serde(default)]
        reason: Option<String>,
        /// Verification findings.
        #[serde(default)]
        findings: Option<String>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::CreateBill { .. } => "create_bill",
            Self::CreateSubscription { .. } => "create_subscription",
            Self::CreatePolicy { .. } => "create_policy",
            Self::SubmitClaim { .. } => "submit_claim",
            Self::CreateContract { .. } => "create_contract",
            Self::RegisterTemplate { .. } => "register_template",
            Self::DeactivateTemplate { .. } => "deactivate_template",
            Self::CreateFromTemplate { .. } => "create_from_template",
            Self::RequestVerification { .. } => "request_verification",
            Self::Act { .. } => "act",
        }
    }
}

// ── Report ───────────────────────────────────────────────────────────

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Position in the scenario, from 0.
    pub index: usize,
    /// Operation name.
    pub op: &'static str,
    /// Step result, or `null` on an expected failure.
    pub result: Value,
    /// Error message of an expected failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Per-step outcomes.
    pub steps: Vec<StepReport>,
    /// Labels assigned by the scenario.
    pub labels: BTreeMap<String, String>,
    /// Every obligation, in creation order.
    pub obligations: Vec<Obligation>,
    /// The full event log.
    pub events: Vec<ObligationEvent>,
    /// Dispatched payments, in dispatch order.
    pub payments: Vec<PaymentRecord>,
}

// ── Replay ───────────────────────────────────────────────────────────

struct Replay {
    clock: Arc<ManualClock>,
    engine: ObligationEngine,
    payments: Arc<InMemoryPaymentProcessor>,
    obligations: HashMap<String, ObligationId>,
    templates: HashMap<String, TemplateId>,
}

impl Replay {
    fn new(scenario: &Scenario) -> Result<Self> {
        let config = match &scenario.engine {
            Some(config) => config.clone(),
            None => EngineConfig::from_env()?,
        };
        config.validate()?;

        let clock = Arc::new(ManualClock::new(scenario.start));
        let jurisdictions = Arc::new(StaticJurisdictionRegistry::with_active(
            scenario.jurisdictions.iter().cloned(),
        ));
        let identity = Arc::new(InMemoryIdentityService::new());
        for grant in &scenario.identities {
            identity.verify(grant.address.clone(), grant.jurisdiction.clone(), grant.level);
        }
        let gate: Arc<dyn ComplianceGate> = if scenario.rules.is_empty() {
            Arc::new(PermissiveGate)
        } else {
            Arc::new(RulebookGate::from_specs(scenario.rules.iter()))
        };
        let payments = Arc::new(InMemoryPaymentProcessor::new());
        for payer in &scenario.declined_payers {
            payments.decline_payer(payer.clone());
        }
        let items = Arc::new(InMemoryItemRegistry::new());
        for item in &scenario.items {
            items.register(item.clone());
        }

        let services = Services {
            gate,
            jurisdictions,
            identity,
            payments: payments.clone(),
            documents: Arc::new(InMemoryDocumentRegistry::new()),
            policies: PolicySource::Local,
            items,
        };
        let engine = ObligationEngine::new(scenario.admin.clone(), config, clock.clone(), services);
        Ok(Self {
            clock,
            engine,
            payments,
            obligations: HashMap::new(),
            templates: HashMap::new(),
        })
    }

    fn obligation(&self, label: &str) -> Result<ObligationId> {
        self.obligations
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("unknown obligation label `{label}`"))
    }

    fn template(&self, label: &str) -> Result<TemplateId> {
        self.templates
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("unknown template label `{label}`"))
    }

    fn save(&mut self, label: &str, id: ObligationId) -> Value {
        self.obligations.insert(label.to_string(), id);
        json!({ "id": id.to_string() })
    }

    /// Run one step. The outer error is a scenario defect (bad label);
    /// the inner one is the engine's verdict.
    fn execute(&mut self, step: &Step) -> Result<Result<Value, EngineError>> {
        let engine = &self.engine;
        Ok(match step {
            Step::Advance { days, seconds } => {
                self.clock
                    .advance_secs(days.saturating_mul(86_400).saturating_add(*seconds));
                Ok(json!({ "now": self.engine.now().to_string() }))
            }
            Step::CreateBill { actor, save, bill } => engine
                .create_bill(actor, bill.clone())
                .map(|id| self.save(save, id)),
            Step::CreateSubscription {
                actor,
                save,
                subscription,
            } => engine
                .create_subscription(actor, subscription.clone())
                .map(|id| self.save(save, id)),
            Step::CreatePolicy { actor, save, policy } => engine
                .create_policy(actor, policy.clone())
                .map(|id| self.save(save, id)),
            Step::SubmitClaim {
                actor,
                save,
                policy,
                amount,
                description,
                reference,
                documents,
            } => {
                let claim = NewClaim {
                    policy: self.obligation(policy)?,
                    amount: *amount,
                    description: description.clone(),
                    reference: reference.clone(),
                    documents: documents.clone(),
                };
                engine
                    .submit_claim(actor, claim)
                    .map(|id| self.save(save, id))
            }
            Step::CreateContract {
                actor,
                save,
                contract,
            } => engine
                .create_contract(actor, contract.clone())
                .map(|id| self.save(save, id)),
            Step::RegisterTemplate {
                actor,
                save,
                template,
            } => engine.register_template(actor, template.clone()).map(|id| {
                self.templates.insert(save.clone(), id);
                json!({ "template": id.to_string() })
            }),
            Step::DeactivateTemplate { actor, template } => engine
                .deactivate_template(actor, &self.template(template)?)
                .map(|()| Value::Null),
            Step::CreateFromTemplate {
                actor,
                save,
                template,
                signatories,
                title,
                reference,
            } => {
                let request = FromTemplate {
                    template: self.template(template)?,
                    signatories: signatories.clone(),
                    title: title.clone(),
                    reference: reference.clone(),
                    documents: Vec::new(),
                };
                engine
                    .create_from_template(actor, request)
                    .map(|id| self.save(save, id))
            }
            Step::RequestVerification {
                actor,
                save,
                verification,
            } => engine
                .request_verification(actor, verification.clone())
                .map(|id| self.save(save, id)),
            Step::Act {
                actor,
                target,
                action,
                reason,
                findings,
            } => {
                let id = self.obligation(target)?;
                let kind = engine
                    .get(&id)
                    .map(|o| o.kind)
                    .ok_or_else(|| anyhow!("label `{target}` names no stored obligation"))?;
                act(engine, &id, kind, actor, *action, reason.clone(), findings.clone())?
            }
        })
    }
}

/// Route a generic action to the kind-specific engine operation.
fn act(
    engine: &ObligationEngine,
    id: &ObligationId,
    kind: ObligationKind,
    actor: &PartyAddress,
    action: Action,
    reason: Option<String>,
    findings: Option<String>,
) -> Result<Result<Value, EngineError>> {
    use Action as A;
    use ObligationKind as K;

    let status = |r: Result<covenant_state::ObligationStatus, EngineError>| {
        r.map(|s| json!({ "status": s }))
    };

    Ok(match (kind, action) {
        (K::Bill, A::Issue) => status(engine.issue_bill(id, actor)),
        (K::Bill, A::MarkOverdue) => status(engine.mark_overdue(id, actor)),
        (K::Bill, A::Cancel) => status(engine.cancel_bill(id, actor)),
        (K::Bill, A::Pay) => engine.pay_bill(id, actor).map(|p| json!(p)),
        (K::Subscription, A::ProcessCycle) => engine.process_cycle(id, actor).map(|o| json!(o)),
        (K::Subscription, A::Pause) => status(engine.pause_subscription(id, actor)),
        (K::Subscription, A::Resume) => status(engine.resume_subscription(id, actor)),
        (K::Subscription, A::Cancel) => status(engine.cancel_subscription(id, actor)),
        (K::Subscription, A::Expire) => status(engine.expire_subscription(id, actor)),
        (K::Policy, A::Activate) => status(engine.activate_policy(id, actor)),
        (K::Policy, A::Cancel) => status(engine.cancel_policy(id, actor)),
        (K::Policy, A::Expire) => status(engine.expire_policy(id, actor)),
        (K::Claim, A::StartReview) => {
            status(engine.review_claim(id, actor, ClaimDecision::StartReview))
        }
        (K::Claim, A::Approve) => status(engine.review_claim(id, actor, ClaimDecision::Approve)),
        (K::Claim, A::Reject) => status(engine.review_claim(
            id,
            actor,
            ClaimDecision::Reject {
                reason: reason.unwrap_or_default(),
            },
        )),
        (K::Claim, A::Pay) => engine
            .pay_claim(id, actor)
            .map(|p| json!({ "payment": p.to_string() })),
        (K::Claim, A::Dispute) => status(engine.dispute_claim(id, actor)),
        (K::Contract, A::FinalizeDraft) => status(engine.finalize_draft(id, actor)),
        (K::Contract, A::Sign) => engine.sign_contract(id, actor).map(|o| json!(o)),
        (K::Contract, A::Terminate) => status(engine.terminate_contract(id, actor)),
        (K::Contract, A::Dispute) => status(engine.dispute_contract(id, actor)),
        (K::Verification, A::Approve | A::Reject) => engine
            .decide_verification(id, actor, action == A::Approve, findings.unwrap_or_default())
            .map(|o| json!(o)),
        (kind, action) => bail!("{kind} has no `{action}` operation"),
    })
}

/// Replay `scenario` and collect the report.
///
/// # Errors
///
/// Fails on an invalid engine configuration, an unknown label, an
/// unexpected engine error, or an expected error that did not occur.
pub fn replay(scenario: &Scenario) -> Result<Report> {
    let mut replay = Replay::new(scenario)?;
    let mut steps = Vec::with_capacity(scenario.steps.len());

    for (index, entry) in scenario.steps.iter().enumerate() {
        let op = entry.step.name();
        let outcome = replay
            .execute(&entry.step)
            .with_context(|| format!("step {index} ({op})"))?;
        match (outcome, entry.expect.as_deref()) {
            (Ok(result), None) => {
                tracing::debug!(index, op, "step succeeded");
                steps.push(StepReport {
                    index,
                    op,
                    result,
                    error: None,
                });
            }
            (Ok(_), Some(expected)) => {
                bail!("step {index} ({op}) succeeded but a {expected} error was expected")
            }
            (Err(e), Some(expected)) if e.category().to_string() == expected => {
                tracing::info!(index, op, error = %e, "step failed as expected");
                steps.push(StepReport {
                    index,
                    op,
                    result: Value::Null,
                    error: Some(e.to_string()),
                });
            }
            (Err(e), _) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("step {index} ({op}) failed")));
            }
        }
    }

    let labels = replay
        .obligations
        .iter()
        .map(|(label, id)| (label.clone(), id.to_string()))
        .chain(
            replay
                .templates
                .iter()
                .map(|(label, id)| (label.clone(), id.to_string())),
        )
        .collect();
    let payments = replay.payments.all();

    Ok(Report {
        steps,
        labels,
        obligations: replay.engine.store().list(),
        events: replay.engine.events(),
        payments,
    })
}

/// Parse a scenario from YAML text.
///
/// # Errors
///
/// Returns the YAML error with location.
pub fn parse_scenario(text: &str) -> Result<Scenario> {
    serde_yaml::from_str(text).context("invalid scenario")
}

/// Execute `covenant run`.
pub fn run_scenario(args: &RunArgs) -> Result<u8> {
    let text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario = parse_scenario(&text)?;
    let report = replay(&scenario)?;
    tracing::info!(
        steps = report.steps.len(),
        obligations = report.obligations.len(),
        events = report.events.len(),
        "scenario replayed"
    );

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &args.out {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
start: 2026-01-01T00:00:00Z
admin: ops
steps:
  - { op: advance, days: 2 }
";

    #[test]
    fn parse_defaults() {
        let scenario = parse_scenario(MINIMAL).unwrap();
        assert!(scenario.engine.is_none());
        assert!(scenario.jurisdictions.is_empty());
        assert!(scenario.rules.is_empty());
        assert_eq!(scenario.steps.len(), 1);
        assert!(scenario.steps[0].expect.is_none());
        assert!(matches!(
            scenario.steps[0].step,
            Step::Advance { days: 2, seconds: 0 }
        ));
    }

    #[test]
    fn parse_act_with_expectation() {
        let text = format!(
            "{MINIMAL}  - {{ op: act, actor: bob, target: inv, action: mark_overdue, expect: state }}\n"
        );
        let scenario = parse_scenario(&text).unwrap();
        let entry = &scenario.steps[1];
        assert_eq!(entry.expect.as_deref(), Some("state"));
        match &entry.step {
            Step::Act { action, target, .. } => {
                assert_eq!(*action, Action::MarkOverdue);
                assert_eq!(target, "inv");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(entry.step.name(), "act");
    }

    #[test]
    fn parse_engine_block() {
        let text = "\
start: 2026-01-01T00:00:00Z
admin: ops
engine: { max_signatories: 3 }
steps: []
";
        let scenario = parse_scenario(text).unwrap();
        let config = scenario.engine.unwrap();
        assert_eq!(config.max_signatories, 3);
        assert_eq!(config.max_reference_len, EngineConfig::default().max_reference_len);
    }

    #[test]
    fn parse_rejects_unknown_op() {
        let text = format!("{MINIMAL}  - {{ op: teleport }}\n");
        assert!(parse_scenario(&text).is_err());
    }

    #[test]
    fn advance_moves_the_clock() {
        let scenario = parse_scenario(MINIMAL).unwrap();
        let report = replay(&scenario).unwrap();
        assert_eq!(report.steps[0].result["now"], "2026-01-03T00:00:00Z");
        assert!(report.obligations.is_empty());
        assert!(report.events.is_empty());
    }

    #[test]
    fn huge_advance_parks_the_clock_at_the_latest_time() {
        let text = "\
start: 2026-01-01T00:00:00Z
admin: ops
steps:
  - { op: advance, days: 18446744073709551615 }
  - { op: advance, seconds: 1 }
";
        let report = replay(&parse_scenario(text).unwrap()).unwrap();
        let first = &report.steps[0].result["now"];
        assert_eq!(first, &report.steps[1].result["now"]);
        assert_ne!(first, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn invalid_engine_config_is_refused() {
        let text = "\
start: 2026-01-01T00:00:00Z
admin: ops
engine: { max_signatories: 0 }
steps: []
";
        assert!(replay(&parse_scenario(text).unwrap()).is_err());
    }
}
