//! Multi-party contracts: drafting, finalising, and post-execution
//! termination or dispute. Attestation lives in [`crate::signing`].

use serde::{Deserialize, Serialize};

use covenant_core::{
    ContentDigest, DocumentId, JurisdictionCode, ObligationId, PartyAddress, ValidationError,
};
use covenant_state::{
    Action, ContractTerms, ObligationKind, ObligationStatus, Party, RecordLink, Role,
    SignatureBook, Terms,
};

use crate::engine::{Draft, ObligationEngine};
use crate::error::EngineError;

/// Input to [`ObligationEngine::create_contract`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContract {
    /// Parties whose attestation executes the contract.
    pub signatories: Vec<PartyAddress>,
    /// Human-readable title.
    pub title: String,
    /// Digest of the agreed text.
    #[serde(default)]
    pub body_digest: Option<ContentDigest>,
    /// Caller reference.
    pub reference: String,
    /// Gating jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

/// Fields shared by direct and template-based contract creation.
pub(crate) struct ContractDraft {
    pub creator: PartyAddress,
    pub signatories: Vec<PartyAddress>,
    pub terms: ContractTerms,
    pub reference: String,
    pub jurisdiction: JurisdictionCode,
    pub documents: Vec<DocumentId>,
    pub links: Vec<RecordLink>,
}

impl ObligationEngine {
    /// Draft a contract between `creator` and its signatories.
    pub fn create_contract(
        &self,
        creator: &PartyAddress,
        contract: NewContract,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        self.check_signatories(&contract.signatories)?;
        let draft = Self::draft_contract(ContractDraft {
            creator: creator.clone(),
            signatories: contract.signatories,
            terms: ContractTerms {
                title: contract.title,
                template: None,
                body_digest: contract.body_digest,
            },
            reference: contract.reference,
            jurisdiction: contract.jurisdiction,
            documents: contract.documents,
            links: Vec::new(),
        })?;
        let services = self.services();
        self.store
            .transact(|tx| self.create_in(tx, &services, draft, now))
    }

    /// Creator freezes the draft and opens it for signing.
    pub fn finalize_draft(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Contract, caller, Action::FinalizeDraft)
    }

    /// A listed party terminates an executed contract.
    pub fn terminate_contract(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Contract, caller, Action::Terminate)
    }

    /// A listed party disputes an executed contract.
    pub fn dispute_contract(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<ObligationStatus, EngineError> {
        self.simple_transition(id, ObligationKind::Contract, caller, Action::Dispute)
    }

    /// Signatory count within `1..=max_signatories`, no repeats.
    pub(crate) fn check_signatories(&self, signatories: &[PartyAddress]) -> Result<(), EngineError> {
        let max = self.config.max_signatories;
        if signatories.is_empty() || signatories.len() > max {
            return Err(ValidationError::CountOutOfRange {
                field: "signatories".to_string(),
                min: 1,
                max,
                actual: signatories.len(),
            }
            .into());
        }
        for (i, party) in signatories.iter().enumerate() {
            if signatories[..i].contains(party) {
                return Err(ValidationError::DuplicateParty(party.to_string()).into());
            }
        }
        Ok(())
    }

    pub(crate) fn draft_contract(contract: ContractDraft) -> Result<Draft, EngineError> {
        if contract.terms.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title".to_string()).into());
        }
        let counterparty = contract
            .signatories
            .iter()
            .find(|s| **s != contract.creator)
            .or_else(|| contract.signatories.first())
            .cloned()
            .ok_or_else(|| EngineError::invalid("signatories", "at least one signatory is required"))?;
        let book = SignatureBook::for_signatories(&contract.signatories);
        let mut parties = vec![Party::new(contract.creator.clone(), Role::Creator)];
        parties.extend(
            contract
                .signatories
                .into_iter()
                .map(|s| Party::new(s, Role::Signatory)),
        );
        Ok(Draft {
            kind: ObligationKind::Contract,
            creator: contract.creator,
            counterparty,
            reference: contract.reference,
            jurisdiction: contract.jurisdiction,
            parties,
            terms: Terms::Contract(contract.terms),
            signatures: Some(book),
            links: contract.links,
            documents: contract.documents,
        })
    }
}
