//! Supply-chain verification: an item owner pays a verifier to inspect an
//! item held in a separate registry.

use serde::{Deserialize, Serialize};

use covenant_core::{
    Amount, DocumentId, ItemId, JurisdictionCode, ObligationId, PartyAddress, PaymentId,
    ValidationError,
};
use covenant_state::{
    Action, ObligationKind, ObligationStatus, Party, PaymentMethod, RecordLink, Role, Terms,
    VerificationTerms,
};

use crate::engine::{Draft, ObligationEngine};
use crate::error::EngineError;
use crate::items::ItemRecord;
use crate::payments::PaymentRequest;
use crate::resolver::resolve;

/// Input to [`ObligationEngine::request_verification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVerification {
    /// Who inspects.
    pub verifier: PartyAddress,
    /// Item to inspect.
    pub item: ItemId,
    /// Paid to the verifier on approval. May be zero.
    #[serde(default)]
    pub fee: Amount,
    /// Caller reference.
    pub reference: String,
    /// Gating jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// Result of a verification decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// `verified` or `rejected`.
    pub status: ObligationStatus,
    /// Fee payment, when one was dispatched.
    pub payment: Option<PaymentId>,
}

impl ObligationEngine {
    /// Owner of `item` asks a verifier to inspect it.
    pub fn request_verification(
        &self,
        requester: &PartyAddress,
        request: NewVerification,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        if *requester == request.verifier {
            return Err(ValidationError::DuplicateParty(requester.to_string()).into());
        }
        let services = self.services();
        self.store.transact(|tx| {
            let item: ItemRecord = resolve(services.items.as_ref(), &request.item)?;
            if item.owner != *requester {
                return Err(EngineError::Unauthorized {
                    operation: "verification.create".to_string(),
                    caller: requester.clone(),
                    reason: format!("{} is owned by {}", item.id, item.owner),
                });
            }
            let draft = Draft {
                kind: ObligationKind::Verification,
                creator: requester.clone(),
                counterparty: request.verifier.clone(),
                reference: request.reference,
                jurisdiction: request.jurisdiction,
                parties: vec![
                    Party::new(requester.clone(), Role::Requester),
                    Party::new(request.verifier, Role::Verifier),
                ],
                terms: Terms::Verification(VerificationTerms {
                    item: item.id.clone(),
                    fee: request.fee,
                    findings: None,
                }),
                signatures: None,
                links: vec![RecordLink::Item(item.id)],
                documents: request.documents,
            };
            self.create_in(tx, &services, draft, now)
        })
    }

    /// Verifier approves or rejects. The item is resolved again and must
    /// still exist; a rejection must carry findings.
    pub fn decide_verification(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
        approve: bool,
        findings: String,
    ) -> Result<VerificationOutcome, EngineError> {
        let now = self.now();
        let services = self.services();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Verification)?;
            let action = if approve { Action::Approve } else { Action::Reject };
            let edge = Self::guard(&record, caller, action, &record.roles_of(caller))?;
            let terms = record
                .terms
                .as_verification()
                .cloned()
                .ok_or_else(|| EngineError::invalid("terms", "expected verification terms"))?;
            let _item: ItemRecord = resolve(services.items.as_ref(), &terms.item)?;
            if !approve && findings.trim().is_empty() {
                return Err(EngineError::invalid("findings", "rejection requires findings"));
            }

            let mut payment = None;
            if approve && !terms.fee.is_zero() {
                let requester = record
                    .party(Role::Requester)
                    .cloned()
                    .ok_or_else(|| EngineError::invalid("parties", "verification has no requester"))?;
                let paid = Self::dispatch(
                    &services,
                    PaymentRequest {
                        payer: requester,
                        payee: caller.clone(),
                        amount: terms.fee,
                        method: PaymentMethod::default(),
                        method_data: String::new(),
                        obligation: *id,
                    },
                )?;
                record.link(RecordLink::Payment(paid));
                payment = Some(paid);
            }
            if !findings.trim().is_empty() {
                if let Some(t) = record.terms.as_verification_mut() {
                    t.findings = Some(findings);
                }
            }
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(VerificationOutcome {
                status: edge.to,
                payment,
            })
        })
    }
}
