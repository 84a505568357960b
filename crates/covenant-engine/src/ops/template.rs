//! Contract templates and contracts instantiated from them.

use serde::{Deserialize, Serialize};

use covenant_core::{
    ContentDigest, DocumentId, JurisdictionCode, ObligationId, PartyAddress, TemplateId,
    ValidationError,
};
use covenant_state::{ContractTerms, RecordLink};

use crate::engine::ObligationEngine;
use crate::error::EngineError;
use crate::ops::contract::ContractDraft;
use crate::templates::ContractTemplate;

/// Input to [`ObligationEngine::register_template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    /// Display name.
    pub name: String,
    /// Jurisdiction every instance is created in.
    pub jurisdiction: JurisdictionCode,
    /// Exact signatory count of every instance.
    pub required_signatories: usize,
    /// Digest of the template body.
    pub body_digest: ContentDigest,
}

/// Input to [`ObligationEngine::create_from_template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromTemplate {
    /// Template to instantiate.
    pub template: TemplateId,
    /// Exactly `required_signatories` distinct parties.
    pub signatories: Vec<PartyAddress>,
    /// Contract title.
    pub title: String,
    /// Caller reference.
    pub reference: String,
    /// Documents to link.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

impl ObligationEngine {
    /// Register an active template authored by `author`.
    ///
    /// The jurisdiction must be active and the author verified in it.
    pub fn register_template(
        &self,
        author: &PartyAddress,
        template: NewTemplate,
    ) -> Result<TemplateId, EngineError> {
        let now = self.now();
        if template.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name".to_string()).into());
        }
        let max = self.config.max_signatories;
        if template.required_signatories == 0 || template.required_signatories > max {
            return Err(ValidationError::CountOutOfRange {
                field: "required_signatories".to_string(),
                min: 1,
                max,
                actual: template.required_signatories,
            }
            .into());
        }
        let services = self.services();
        if !services.jurisdictions.is_active(&template.jurisdiction) {
            return Err(EngineError::JurisdictionInactive(template.jurisdiction));
        }
        let level = self.config.required_identity_level;
        if !services
            .identity
            .is_verified(author, &template.jurisdiction, level)
        {
            return Err(EngineError::IdentityNotVerified {
                party: author.clone(),
                jurisdiction: template.jurisdiction,
            });
        }

        let id = TemplateId::new();
        self.store.transact(|tx| {
            tx.put_template(ContractTemplate {
                id,
                author: author.clone(),
                name: template.name,
                jurisdiction: template.jurisdiction,
                required_signatories: template.required_signatories,
                body_digest: template.body_digest,
                active: true,
                created_at: now,
            });
            Ok(())
        })?;
        tracing::info!(template = %id, author = %author, "contract template registered");
        Ok(id)
    }

    /// Author withdraws a template. Existing contracts are unaffected.
    pub fn deactivate_template(
        &self,
        author: &PartyAddress,
        id: &TemplateId,
    ) -> Result<(), EngineError> {
        self.store.transact(|tx| {
            let mut template = tx
                .template(id)
                .cloned()
                .ok_or(EngineError::UnknownTemplate(*id))?;
            if template.author != *author {
                return Err(EngineError::Unauthorized {
                    operation: "template.deactivate".to_string(),
                    caller: author.clone(),
                    reason: "only the template author may deactivate it".to_string(),
                });
            }
            if !template.active {
                return Err(EngineError::TemplateInactive(*id));
            }
            template.active = false;
            tx.put_template(template);
            Ok(())
        })?;
        tracing::info!(template = %id, author = %author, "contract template deactivated");
        Ok(())
    }

    /// Draft a contract from an active template.
    pub fn create_from_template(
        &self,
        creator: &PartyAddress,
        request: FromTemplate,
    ) -> Result<ObligationId, EngineError> {
        let now = self.now();
        self.check_signatories(&request.signatories)?;
        let services = self.services();
        self.store.transact(|tx| {
            let template = tx
                .template(&request.template)
                .cloned()
                .ok_or(EngineError::UnknownTemplate(request.template))?;
            if !template.active {
                return Err(EngineError::TemplateInactive(template.id));
            }
            if request.signatories.len() != template.required_signatories {
                return Err(ValidationError::CountOutOfRange {
                    field: "signatories".to_string(),
                    min: template.required_signatories,
                    max: template.required_signatories,
                    actual: request.signatories.len(),
                }
                .into());
            }
            let draft = Self::draft_contract(ContractDraft {
                creator: creator.clone(),
                signatories: request.signatories,
                terms: ContractTerms {
                    title: request.title,
                    template: Some(template.id),
                    body_digest: Some(template.body_digest),
                },
                reference: request.reference,
                jurisdiction: template.jurisdiction,
                documents: request.documents,
                links: vec![RecordLink::Template(template.id)],
            })?;
            self.create_in(tx, &services, draft, now)
        })
    }
}
