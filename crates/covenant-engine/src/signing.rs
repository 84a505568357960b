//! # Signature Coordinator
//!
//! A signatory's attestation is recorded in the contract's
//! [`SignatureBook`](covenant_state::SignatureBook) and applied as a
//! `sign` self-transition. When the attestation completes the book, the
//! `execute` edge is applied in the same transaction, so the caller sees a
//! single operation that ends in `executed`.
//!
//! The completeness scan is linear in the number of signatories, which is
//! capped at creation by `EngineConfig::max_signatories`.

use serde::{Deserialize, Serialize};

use covenant_core::{ObligationId, PartyAddress};
use covenant_state::{Action, ObligationKind};

use crate::engine::ObligationEngine;
use crate::error::EngineError;

/// Result of one attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignOutcome {
    /// More signatures are needed.
    Pending {
        /// Attestations so far, including this one.
        attested: usize,
        /// Signatories in total.
        required: usize,
    },
    /// This attestation completed the set; the contract is executed.
    Executed,
}

impl ObligationEngine {
    /// Record `caller`'s signature on a contract awaiting signatures.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Unauthorized`] if `caller` is not a signatory.
    /// - [`EngineError::InvalidTransition`] outside `pending_signatures`.
    /// - [`EngineError::AlreadyAttested`] on a second signature.
    pub fn sign_contract(
        &self,
        id: &ObligationId,
        caller: &PartyAddress,
    ) -> Result<SignOutcome, EngineError> {
        let now = self.now();
        self.store.transact(|tx| {
            let mut record = tx.load_kind(id, ObligationKind::Contract)?;
            let held = record.roles_of(caller);
            let sign = Self::guard(&record, caller, Action::Sign, &held)?;

            let book = record
                .signatures
                .as_mut()
                .ok_or_else(|| EngineError::invalid("signatures", "contract has no signature book"))?;
            book.attest(caller, now)
                .map_err(|e| EngineError::from_signature(e, *id))?;
            let complete = book.is_complete();
            let attested = book.attested_count();
            let required = book.required_count();
            tracing::info!(contract = %id, signer = %caller, attested, required, "attestation recorded");

            Self::apply(tx, &mut record, sign, caller, now);
            let outcome = if complete {
                let execute = Self::guard(&record, caller, Action::Execute, &held)?;
                Self::apply(tx, &mut record, execute, caller, now);
                SignOutcome::Executed
            } else {
                SignOutcome::Pending { attested, required }
            };
            tx.put(record);
            Ok(outcome)
        })
    }
}
