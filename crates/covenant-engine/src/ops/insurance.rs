//! Policies and the claims raised against them.
//!
//! A claim stores only its policy id. Whenever a claim operation needs to
//! know who the insurer is, the policy is resolved again through the
//! configured [`PolicySource`](crate::resolver::PolicySource), so an
//! insurer recorded on the claim at submission time grants nothing by
//! itself.

use serde::{Deserialize, Serialize};

use covenant_core::{
    Amount, DocumentId, JurisdictionCode, ObligationId, PartyAddress, PaymentId, Timestamp,
    ValidationError,
};
use covenant_state::{
    Action, ClaimTerms, Obligation, ObligationKind, ObligationStatus, Party, PaymentMethod,
    PolicyTerms, RecordLink, Role, Terms,
};

use crate::admin::Services;
use crate::engine::{Draft, ObligationEngine};
use crate::error::EngineError;
use crate::payments::PaymentRequest;
use crate::resolver::PolicyRecord;
use crate::store::Transaction;

/// Input to [`ObligationEngine::create_policy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPolicy {
    /// Covered party.
    pub beneficiary: PartyAddress,
    /// Product label.
    pub policy_type: String,
    /// Maximum payout per claim.
    pub coverage: Amount,
    /// Premium per term.
    pub premium: Amount,
    /// Start of cover, strictly in the future.
    pub start: Timestamp,
    /// End of cover, strictly after `start`.
    pub end: Timestamp,
    /// Caller reference.
    pub reference: String,
    /// Gating jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// Input to [`ObligationEngine::submit_claim`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    /// Policy claimed against.
    pub policy: ObligationId,
    /// Amount claimed; at most the policy coverage.
    pub amount: Amount,
    /// Claimant's account of the loss.
    #[serde(default)]
    pub description: String,
    /// Caller reference.
    pub reference: String,
    /// Documents to link (evidence).
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// Insurer's review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ClaimDecision {
    /// `submitted → under_review`.
    StartReview,
    /// Approve for payment.
    Approve,
    /// Reject; the reason must not be empty.
    Reject {
        /// Stored on the claim.
        reason: String,
    },
}

impl ClaimDecision {
    fn action(&self) -> Action {
        match self {
            Self::StartReview => Action::StartReview,
            Self::Approve => Action::Approve,
            Self::Reject { .. } => Action::Reject,
        }
    }
}

impl ObligationEngine {
    // ── Policies ─────────────────────────────────────────────────────

    /// Underwrite a policy for a beneficiary. The insurer is the creator.
    pub fn create_policy(
        &self,
        insurer: &PartyAddress,
        policy: NewPolicy,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        let coverage = policy.coverage.ensure_positive()?;
        let premium = policy.premium.ensure_positive()?;
        if *insurer == policy.beneficiary {
            return Err(ValidationError::DuplicateParty(insurer.to_string()).into());
        }
        if policy.policy_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("policy_type".to_string()).into());
        }
        policy.start.require_after(now, "start")?;
        policy.end.require_after(policy.start, "end")?;

        let draft = Draft {
            kind: ObligationKind::Policy,
            creator: insurer.clone(),
            counterparty: policy.beneficiary.clone(),
            reference: policy.reference,
            jurisdiction: policy.jurisdiction,
            parties: vec![
                Party::new(insurer.clone(), Role::Insurer),
                Party::new(policy.beneficiary, Role::Beneficiary),
            ],
            terms: Terms::Policy(PolicyTerms {
                policy_type: policy.policy_type,
                coverage,
                premium,
                start: policy.start,
                end: policy.end,
            }),
            signatures: None,
            links: Vec::new(),
            documents: policy.documents,
        };
        let services = self.services();
        self.store
            .transact(|tx| self.create_in(tx, &services, draft, now))
    }

    /// Insurer activates a created policy.
    pub fn activate_policy(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Policy, caller, Action::Activate)
    }

    /// Insurer or beneficiary cancels an active policy.
    pub fn cancel_policy(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Policy, caller, Action::Cancel)
    }

    /// Insurer expires an active policy once its end date has passed.
    pub fn expire_policy(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        let now = self.now();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Policy)?;
            let edge = Self::guard(&record, caller, Action::Expire, &record.roles_of(caller))?;
            let end = record
                .terms
                .as_policy()
                .map(|t| t.end)
                .ok_or_else(|| EngineError::invalid("terms", "expected policy terms"))?;
            if now <= end {
                return Err(EngineError::NotDue { id: *id, due: end, now });
            }
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(edge.to)
        })
    }

    // ── Claims ───────────────────────────────────────────────────────

    /// Beneficiary of an active policy raises a claim against it.
    pub fn submit_claim(
        &self,
        claimant: &PartyAddress,
        claim: NewClaim,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        let amount = claim.amount.ensure_positive()?;
        let services = self.services();
        self.store.transact(|tx| {
            let policy = services.policies.resolve(tx, &claim.policy)?;
            if policy.status != ObligationStatus::Active {
                return Err(EngineError::PrerequisiteStatus {
                    id: policy.id,
                    actual: policy.status,
                    expected: ObligationStatus::Active,
                });
            }
            if now > policy.end {
                return Err(EngineError::CoverEnded {
                    policy: policy.id,
                    end: policy.end,
                    now,
                });
            }
            if policy.beneficiary != *claimant {
                return Err(EngineError::Unauthorized {
                    operation: "claim.create".to_string(),
                    caller: claimant.clone(),
                    reason: format!("only the beneficiary of {} may claim", policy.id),
                });
            }
            if amount > policy.coverage {
                return Err(EngineError::invalid(
                    "amount",
                    format!("{amount} exceeds coverage {}", policy.coverage),
                ));
            }

            let draft = Draft {
                kind: ObligationKind::Claim,
                creator: claimant.clone(),
                counterparty: policy.insurer.clone(),
                reference: claim.reference,
                jurisdiction: policy.jurisdiction,
                parties: vec![
                    Party::new(claimant.clone(), Role::Claimant),
                    Party::new(policy.insurer, Role::Insurer),
                ],
                terms: Terms::Claim(ClaimTerms {
                    policy: policy.id,
                    amount,
                    description: claim.description,
                    rejection_reason: None,
                }),
                signatures: None,
                links: vec![RecordLink::Policy(policy.id)],
                documents: claim.documents,
            };
            self.create_in(tx, &services, draft, now)
        })
    }

    /// Insurer of the claim's policy moves the review forward.
    pub fn review_claim(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
        decision: ClaimDecision,
    ) -> Result<ObligationStatus, EngineError> {
        let now = self.now();
        let services = self.services();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Claim)?;
            let (held, _) = claim_roles(tx, &services, &record, caller)?;
            let edge = Self::guard(&record, caller, decision.action(), &held)?;
            if let ClaimDecision::Reject { reason } = decision {
                if reason.trim().is_empty() {
                    return Err(EngineError::invalid("reason", "rejection requires a reason"));
                }
                if let Some(t) = record.terms.as_claim_mut() {
                    t.rejection_reason = Some(reason);
                }
            }
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(edge.to)
        })
    }

    /// Insurer pays an approved claim to the claimant.
    pub fn pay_claim(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<PaymentId, EngineError> {
        let now = self.now();
        let services = self.services();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Claim)?;
            let (held, policy) = claim_roles(tx, &services, &record, caller)?;
            let edge = Self::guard(&record, caller, Action::Pay, &held)?;
            let amount = claim_terms(&record)?.amount;
            let claimant = record
                .party(Role::Claimant)
                .cloned()
                .ok_or_else(|| EngineError::invalid("parties", "claim has no claimant"))?;

            let payment = Self::dispatch(
                &services,
                PaymentRequest {
                    payer: policy.insurer,
                    payee: claimant,
                    amount,
                    method: PaymentMethod::default(),
                    method_data: String::new(),
                    obligation: *id,
                },
            )?;
            record.link(RecordLink::Payment(payment));
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(payment)
        })
    }

    /// Claimant disputes a rejected claim.
    pub fn dispute_claim(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Claim, caller, Action::Dispute)
    }
}

/// Roles `caller` holds on a claim, with the insurer role taken from the
/// freshly resolved policy instead of the claim record.
fn claim_roles(
    tx: &Transaction<'_>,
    services: &Services,
    record: &Obligation,
    caller: &PartyAddress,
) -> Result<(Vec<Role>, PolicyRecord), EngineError> {
    let policy = services.policies.resolve(tx, &claim_terms(record)?.policy)?;
    let mut held: Vec<Role> = record
        .roles_of(caller)
        .into_iter()
        .filter(|r| *r != Role::Insurer)
        .collect();
    if policy.insurer == *caller {
        held.push(Role::Insurer);
    }
    Ok((held, policy))
}

fn claim_terms(record: &Obligation) -> Result<&ClaimTerms, EngineError> {
    record
        .terms
        .as_claim()
        .ok_or_else(|| EngineError::invalid("terms", "expected claim terms"))
}
