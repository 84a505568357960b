//! # Signature Book
//!
//! Per-contract attestation state: an ordered map from each required
//! signatory to whether and when it attested. The creator-only role never
//! appears here.
//!
//! The book only records attestations. Whether the contract may accept one
//! (status `pending_signatures`), and promoting it once the book is
//! complete, is the engine's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use covenant_core::{PartyAddress, Timestamp};

use crate::error::SignatureError;

/// Attestation state of one signatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attestation {
    /// Whether the party has signed.
    pub attested: bool,
    /// When the party signed.
    pub at: Option<Timestamp>,
}

/// Required signatories of one contract and their attestations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureBook {
    entries: BTreeMap<PartyAddress, Attestation>,
}

impl SignatureBook {
    /// A book with every signatory unattested. Duplicates collapse.
    pub fn for_signatories<'a>(signatories: impl IntoIterator<Item = &'a PartyAddress>) -> Self {
        Self {
            entries: signatories
                .into_iter()
                .map(|p| (p.clone(), Attestation::default()))
                .collect(),
        }
    }

    /// Record `party`'s attestation at `at`.
    ///
    /// # Errors
    ///
    /// [`SignatureError::NotASignatory`] for a party outside the book,
    /// [`SignatureError::AlreadyAttested`] on a second attestation. Neither
    /// changes the book.
    pub fn attest(&mut self, party: &PartyAddress, at: Timestamp) -> Result<(), SignatureError> {
        let entry = self
            .entries
            .get_mut(party)
            .ok_or_else(|| SignatureError::NotASignatory(party.clone()))?;
        if entry.attested {
            return Err(SignatureError::AlreadyAttested(party.clone()));
        }
        *entry = Attestation {
            attested: true,
            at: Some(at),
        };
        Ok(())
    }

    /// Whether every required signatory has attested.
    pub fn is_complete(&self) -> bool {
        !self.entries.is_empty() && self.entries.values().all(|a| a.attested)
    }

    /// Number of attestations recorded.
    pub fn attested_count(&self) -> usize {
        self.entries.values().filter(|a| a.attested).count()
    }

    /// Number of required signatories.
    pub fn required_count(&self) -> usize {
        self.entries.len()
    }

    /// Attestation state of one party.
    pub fn get(&self, party: &PartyAddress) -> Option<&Attestation> {
        self.entries.get(party)
    }

    /// Signatories yet to attest, in address order.
    pub fn pending(&self) -> impl Iterator<Item = &PartyAddress> {
        self.entries
            .iter()
            .filter(|(_, a)| !a.attested)
            .map(|(p, _)| p)
    }

    /// All entries, in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&PartyAddress, &Attestation)> {
        self.entries.iter()
    }
}
