//! # Obligation Engine
//!
//! One engine serves every obligation kind. This module holds the
//! construction, administration, and read surface plus the two pipelines
//! every kind-specific operation is built from:
//!
//! - **create**: validation → jurisdiction active → identities verified →
//!   compliance gate → id derivation → persist and index → document links
//!   → event.
//! - **transition**: load → lifecycle table guard (role, then status) →
//!   operation-specific checks and side effects → apply → event.
//!
//! Both run inside one store transaction, so any failure discards
//! everything staged so far. The compliance gate runs only on creation.

use std::sync::Arc;

use serde::Serialize;

use covenant_compliance::{
    ComplianceGate, IdentityService, JurisdictionRegistry, OperationTag,
};
use covenant_core::{
    sha256_digest, CanonicalBytes, Clock, DocumentId, JurisdictionCode, ObligationId,
    PartyAddress, PaymentId, TemplateId, Timestamp, ValidationError,
};
use covenant_state::{
    table, Action, Edge, Obligation, ObligationKind, ObligationStatus, Party, RecordLink, Role,
    SignatureBook, Terms,
};

use crate::admin::{Administrator, ServiceSlots, Services};
use crate::config::EngineConfig;
use crate::documents::DocumentRegistry;
use crate::error::EngineError;
use crate::events::ObligationEvent;
use crate::items::ItemRecord;
use crate::payments::{PaymentProcessor, PaymentRecord, PaymentRequest};
use crate::resolver::{resolve, PolicyRecord, PolicySource, RecordSource};
use crate::store::{ObligationStore, Transaction};
use crate::templates::ContractTemplate;

/// The obligation lifecycle engine.
pub struct ObligationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) store: ObligationStore,
    admin: Administrator,
    services: ServiceSlots,
}

impl std::fmt::Debug for ObligationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObligationEngine")
            .field("config", &self.config)
            .field("now", &self.clock.now())
            .field("obligations", &self.store.len())
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl ObligationEngine {
    /// Wire an engine to its collaborators.
    pub fn new(
        admin: PartyAddress,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        services: Services,
    ) -> Self {
        Self::with_store(admin, config, clock, services, ObligationStore::new())
    }

    /// Like [`new`](Self::new) over an existing store handle.
    pub fn with_store(
        admin: PartyAddress,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        services: Services,
        store: ObligationStore,
    ) -> Self {
        tracing::info!(admin = %admin, max_signatories = config.max_signatories, "obligation engine started");
        Self {
            config,
            clock,
            store,
            admin: Administrator::new(admin),
            services: ServiceSlots::new(services),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle on the underlying store (cloneable; shares state).
    pub fn store(&self) -> &ObligationStore {
        &self.store
    }

    /// Current ledger time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn services(&self) -> Services {
        self.services.snapshot()
    }

    // ── Administration ───────────────────────────────────────────────

    /// Current administrator.
    pub fn administrator(&self) -> PartyAddress {
        self.admin.address()
    }

    /// Hand the administrator role to `next`.
    pub fn transfer_admin(&self, caller: &PartyAddress, next: PartyAddress) -> Result<(), EngineError> {
        self.admin.transfer(caller, next)
    }

    /// Replace the compliance gate.
    pub fn set_compliance_gate(
        &self,
        caller: &PartyAddress,
        gate: Arc<dyn ComplianceGate>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.gate = gate);
        tracing::info!(by = %caller, "compliance gate replaced");
        Ok(())
    }

    /// Replace the jurisdiction registry.
    pub fn set_jurisdiction_registry(
        &self,
        caller: &PartyAddress,
        registry: Arc<dyn JurisdictionRegistry>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.jurisdictions = registry);
        tracing::info!(by = %caller, "jurisdiction registry replaced");
        Ok(())
    }

    /// Replace the identity service.
    pub fn set_identity_service(
        &self,
        caller: &PartyAddress,
        identity: Arc<dyn IdentityService>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.identity = identity);
        tracing::info!(by = %caller, "identity service replaced");
        Ok(())
    }

    /// Replace the payment processor.
    pub fn set_payment_processor(
        &self,
        caller: &PartyAddress,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.payments = payments);
        tracing::info!(by = %caller, "payment processor replaced");
        Ok(())
    }

    /// Replace the document registry.
    pub fn set_document_registry(
        &self,
        caller: &PartyAddress,
        documents: Arc<dyn DocumentRegistry>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.documents = documents);
        tracing::info!(by = %caller, "document registry replaced");
        Ok(())
    }

    /// Point claim resolution at another policy source.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAdministrator`], or [`EngineError::InvalidInput`]
    /// for a handle on this engine's own store, which claim operations
    /// would read while holding its write lock. Use
    /// [`PolicySource::Local`] for that.
    pub fn set_policy_source(
        &self,
        caller: &PartyAddress,
        policies: PolicySource,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        if policies.reads_store(&self.store) {
            return Err(EngineError::invalid(
                "policy_source",
                "external source is this engine's own store",
            ));
        }
        tracing::info!(by = %caller, source = ?policies, "policy source replaced");
        self.services.update(|s| s.policies = policies);
        Ok(())
    }

    /// Point verification requests at another item registry.
    pub fn set_item_source(
        &self,
        caller: &PartyAddress,
        items: Arc<dyn RecordSource<ItemRecord>>,
    ) -> Result<(), EngineError> {
        self.admin.require(caller)?;
        self.services.update(|s| s.items = items);
        tracing::info!(by = %caller, "item source replaced");
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Committed obligation by id.
    pub fn get(&self, id: &ObligationId) -> Option<Obligation> {
        self.store.get(id)
    }

    /// Obligations in which `address` holds any role, in creation order.
    pub fn list_by_party(&self, address: &PartyAddress) -> Vec<Obligation> {
        self.store.list_by_party(address)
    }

    /// Linked records of one obligation.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownObligation`].
    pub fn list_linked(&self, id: &ObligationId) -> Result<Vec<RecordLink>, EngineError> {
        self.store
            .get(id)
            .map(|r| r.linked_records)
            .ok_or(EngineError::UnknownObligation(*id))
    }

    /// Signature book of a contract.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownObligation`] or [`EngineError::WrongKind`].
    pub fn signatures(&self, id: &ObligationId) -> Result<SignatureBook, EngineError> {
        let record = self
            .store
            .get(id)
            .ok_or(EngineError::UnknownObligation(*id))?;
        match record.signatures {
            Some(book) if record.kind == ObligationKind::Contract => Ok(book),
            _ => Err(EngineError::WrongKind {
                id: *id,
                actual: record.kind,
                expected: ObligationKind::Contract,
            }),
        }
    }

    /// Payment record from the current payment processor.
    pub fn payment(&self, id: &PaymentId) -> Option<PaymentRecord> {
        self.services().payments.payment(id)
    }

    /// Committed contract template.
    pub fn template(&self, id: &TemplateId) -> Option<ContractTemplate> {
        self.store.template(id)
    }

    /// Lifecycle events of one obligation, oldest first.
    pub fn events_for(&self, id: &ObligationId) -> Vec<ObligationEvent> {
        self.store.events_for(id)
    }

    /// The whole event log.
    pub fn events(&self) -> Vec<ObligationEvent> {
        self.store.events()
    }

    /// Resolve a policy through the configured source, as claims do.
    ///
    /// # Errors
    ///
    /// [`EngineError::Resolution`].
    pub fn resolve_policy(&self, id: &ObligationId) -> Result<PolicyRecord, EngineError> {
        match self.services().policies {
            PolicySource::Local => resolve(&self.store, id),
            PolicySource::External(source) => resolve(source.as_ref(), id),
        }
    }

    // ── Creation pipeline ────────────────────────────────────────────

    /// Run the creation pipeline for `draft` inside `tx`.
    pub(crate) fn create_in(
        &self,
        tx: &mut Transaction<'_>,
        services: &Services,
        draft: Draft,
        now: Timestamp,
    ) -> Result<ObligationId, EngineError> {
        self.validate_draft(&draft)?;

        if !services.jurisdictions.is_active(&draft.jurisdiction) {
            tracing::warn!(jurisdiction = %draft.jurisdiction, kind = %draft.kind, "creation in inactive jurisdiction");
            return Err(EngineError::JurisdictionInactive(draft.jurisdiction));
        }

        let level = self.config.required_identity_level;
        let mut seen: Vec<&PartyAddress> = Vec::new();
        for party in &draft.parties {
            if seen.contains(&&party.address) {
                continue;
            }
            seen.push(&party.address);
            if !services
                .identity
                .is_verified(&party.address, &draft.jurisdiction, level)
            {
                tracing::warn!(party = %party.address, jurisdiction = %draft.jurisdiction, level = %level, "unverified party");
                return Err(EngineError::IdentityNotVerified {
                    party: party.address.clone(),
                    jurisdiction: draft.jurisdiction,
                });
            }
        }

        let tag = OperationTag::new(draft.kind.as_str(), "create");
        let intent = CanonicalBytes::new(&CreationIntent {
            kind: draft.kind,
            jurisdiction: &draft.jurisdiction,
            creator: &draft.creator,
            counterparty: &draft.counterparty,
            reference: &draft.reference,
            parties: &draft.parties,
            terms: &draft.terms,
        })?;
        let decision = services
            .gate
            .evaluate(&draft.jurisdiction, &tag, intent.as_bytes());
        if !decision.allowed {
            tracing::warn!(jurisdiction = %draft.jurisdiction, operation = %tag, reason = %decision.reason, "creation denied by compliance gate");
            return Err(EngineError::ComplianceRejected {
                jurisdiction: draft.jurisdiction,
                operation: tag.to_string(),
                reason: decision.reason.0,
            });
        }

        let nonce = tx.next_nonce();
        let id = derive_id(
            draft.kind,
            &draft.creator,
            &draft.counterparty,
            &draft.reference,
            now,
            nonce,
        )?;

        let status = draft.kind.initial_status();
        let mut record = Obligation {
            id,
            kind: draft.kind,
            created_by: draft.creator.clone(),
            parties: draft.parties,
            status,
            jurisdiction: draft.jurisdiction,
            reference: draft.reference,
            terms: draft.terms,
            linked_records: Vec::new(),
            signatures: draft.signatures,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };
        for link in draft.links {
            record.link(link);
        }
        tx.insert(record.clone())?;

        for document in &draft.documents {
            if let Err(e) = services.documents.link(document, &id, draft.kind.as_str()) {
                tracing::warn!(obligation = %id, document = %document, error = %e, "document link failed");
            }
            record.link(RecordLink::Document(*document));
        }
        if !draft.documents.is_empty() {
            tx.put(record);
        }

        tx.record(ObligationEvent::created(
            id,
            draft.kind,
            status,
            draft.creator.clone(),
            now,
        ));
        tracing::info!(obligation = %id, kind = %draft.kind, creator = %draft.creator, status = %status, "obligation created");
        Ok(id)
    }

    fn validate_draft(&self, draft: &Draft) -> Result<(), EngineError> {
        if draft.reference.trim().is_empty() {
            return Err(ValidationError::EmptyField("reference".to_string()).into());
        }
        if draft.reference.len() > self.config.max_reference_len {
            return Err(ValidationError::TooLong {
                field: "reference".to_string(),
                max: self.config.max_reference_len,
            }
            .into());
        }
        if draft.parties.is_empty() {
            return Err(EngineError::invalid("parties", "at least one party is required"));
        }
        if draft.documents.len() > self.config.max_linked_documents {
            return Err(ValidationError::CountOutOfRange {
                field: "documents".to_string(),
                min: 0,
                max: self.config.max_linked_documents,
                actual: draft.documents.len(),
            }
            .into());
        }
        debug_assert_eq!(draft.terms.kind(), draft.kind);
        Ok(())
    }

    // ── Transition pipeline ──────────────────────────────────────────

    /// Check role, then status, against the lifecycle table.
    pub(crate) fn guard(
        record: &Obligation,
        caller: &PartyAddress,
        action: Action,
        held: &[Role],
    ) -> Result<&'static Edge, EngineError> {
        table::guard(record.kind, record.status, action, held).map_err(|e| {
            tracing::debug!(obligation = %record.id, kind = %record.kind, status = %record.status, action = %action, caller = %caller, error = %e, "transition rejected");
            EngineError::from_guard(e, record.id, caller)
        })
    }

    /// Apply an accepted edge and stage its event. The caller still has
    /// to `put` the record.
    pub(crate) fn apply(
        tx: &mut Transaction<'_>,
        record: &mut Obligation,
        edge: &Edge,
        caller: &PartyAddress,
        now: Timestamp,
    ) {
        let rec = record.apply(edge, caller, now);
        tracing::info!(obligation = %record.id, kind = %record.kind, from = %rec.from, to = %rec.to, action = %rec.action, actor = %caller, "transition applied");
        tx.record(ObligationEvent::transitioned(record.id, record.kind, &rec));
    }

    /// Load, guard with the caller's own roles, apply, and store.
    pub(crate) fn simple_transition(
        &self,
        id: &ObligationId,
        kind: ObligationKind,
        caller: &PartyAddress,
        action: Action,
    ) -> Result<ObligationStatus, EngineError> {
        let now = self.now();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, kind)?;
            let edge = Self::guard(&record, caller, action, &record.roles_of(caller))?;
            Self::apply(tx, &mut record, edge, caller, now);
            tx.put(record);
            Ok(edge.to)
        })
    }

    /// Dispatch a payment, mapping failures to a dependency error.
    pub(crate) fn dispatch(
        services: &Services,
        request: PaymentRequest,
    ) -> Result<PaymentId, EngineError> {
        services.payments.dispatch(&request).map_err(|e| {
            tracing::warn!(obligation = %request.obligation, payer = %request.payer, error = %e, "payment dispatch failed");
            EngineError::PaymentFailed(e.to_string())
        })
    }
}

/// Everything the creation pipeline needs about a new obligation.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub kind: ObligationKind,
    pub creator: PartyAddress,
    pub counterparty: PartyAddress,
    pub reference: String,
    pub jurisdiction: JurisdictionCode,
    pub parties: Vec<Party>,
    pub terms: Terms,
    pub signatures: Option<SignatureBook>,
    pub links: Vec<RecordLink>,
    pub documents: Vec<DocumentId>,
}

/// Payload handed to the compliance gate.
#[derive(Serialize)]
struct CreationIntent<'a> {
    kind: ObligationKind,
    jurisdiction: &'a JurisdictionCode,
    creator: &'a PartyAddress,
    counterparty: &'a PartyAddress,
    reference: &'a str,
    parties: &'a [Party],
    terms: &'a Terms,
}

#[derive(Serialize)]
struct IdSeed<'a> {
    creator: &'a PartyAddress,
    counterparty: &'a PartyAddress,
    reference: &'a str,
    created_at: String,
    kind: ObligationKind,
    nonce: u64,
}

/// SHA-256 over the canonical JSON of the creation seed.
///
/// The nonce is the store-wide creation counter, so two creations with
/// identical inputs in the same second still get distinct ids.
pub fn derive_id(
    kind: ObligationKind,
    creator: &PartyAddress,
    counterparty: &PartyAddress,
    reference: &str,
    created_at: Timestamp,
    nonce: u64,
) -> Result<ObligationId, EngineError> {
    let bytes = CanonicalBytes::new(&IdSeed {
        creator,
        counterparty,
        reference,
        created_at: created_at.to_iso8601(),
        kind,
        nonce,
    })?;
    Ok(ObligationId::from_digest(sha256_digest(&bytes)))
}
