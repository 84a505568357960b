//! # Cross-Record Resolver
//!
//! Claims reference a policy, verification requests reference an item.
//! Neither owns the referenced data; every operation that depends on it
//! (a role check, a coverage limit) resolves the reference afresh through a
//! typed [`RecordSource`].
//!
//! Resolution fails, aborting the enclosing operation, when the source has
//! no record or returns a record whose own id differs from the requested
//! one.
//!
//! Policies are resolved from the engine's own transaction by default, so
//! a claim always sees the policy as of the same atomic operation. An
//! administrator can point the engine at an external policy source instead
//! (for instance another engine's [`ObligationStore`]). A sibling store is
//! read with a bounded wait: two engines resolving through each other's
//! stores get a resolution error rather than a lock cycle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use covenant_core::{Amount, JurisdictionCode, ObligationId, PartyAddress, Timestamp};
use covenant_state::{Obligation, ObligationKind, ObligationStatus, Role};

use crate::error::EngineError;
use crate::store::{ObligationStore, Transaction};

/// A record that can be fetched by id from a sibling component.
pub trait Resolvable: Clone {
    /// Identifier type.
    type Id: PartialEq + fmt::Display;
    /// Label used in errors.
    const KIND: &'static str;

    /// The id embedded in the record itself.
    fn record_id(&self) -> &Self::Id;
}

/// Read-only provider of records of one type.
pub trait RecordSource<R: Resolvable>: Send + Sync {
    /// The record with `id`, if the source has one.
    fn fetch(&self, id: &R::Id) -> Option<R>;

    /// The obligation store behind this source, if it is one.
    fn backing_store(&self) -> Option<&ObligationStore> {
        None
    }
}

/// Longest wait for a sibling store's read lock.
pub const SIBLING_READ_WAIT: Duration = Duration::from_millis(250);

/// Fetch `id` from `source` and check the embedded id.
///
/// # Errors
///
/// [`EngineError::Resolution`] when the record is missing or its id does
/// not match.
pub fn resolve<R, S>(source: &S, id: &R::Id) -> Result<R, EngineError>
where
    R: Resolvable,
    S: RecordSource<R> + ?Sized,
{
    let record = source.fetch(id).ok_or_else(|| {
        tracing::warn!(kind = R::KIND, id = %id, "reference did not resolve");
        EngineError::Resolution {
            kind: R::KIND,
            id: id.to_string(),
            reason: "no such record".to_string(),
        }
    })?;
    if record.record_id() != id {
        tracing::warn!(kind = R::KIND, id = %id, returned = %record.record_id(), "resolved record carries a different id");
        return Err(EngineError::Resolution {
            kind: R::KIND,
            id: id.to_string(),
            reason: format!("source returned {}", record.record_id()),
        });
    }
    Ok(record)
}

// ── Policies ─────────────────────────────────────────────────────────

/// The fields of a policy that claims depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy id.
    pub id: ObligationId,
    /// Underwriter; reviews and pays claims.
    pub insurer: PartyAddress,
    /// Covered party; may submit claims.
    pub beneficiary: PartyAddress,
    /// Current policy status.
    pub status: ObligationStatus,
    /// Maximum payout per claim.
    pub coverage: Amount,
    /// Policy jurisdiction; inherited by claims.
    pub jurisdiction: JurisdictionCode,
    /// End of cover.
    pub end: Timestamp,
}

impl PolicyRecord {
    /// Project a policy obligation. `None` for other kinds.
    pub fn from_obligation(record: &Obligation) -> Option<Self> {
        let terms = record.terms.as_policy()?;
        Some(Self {
            id: record.id,
            insurer: record.party(Role::Insurer)?.clone(),
            beneficiary: record.party(Role::Beneficiary)?.clone(),
            status: record.status,
            coverage: terms.coverage,
            jurisdiction: record.jurisdiction.clone(),
            end: terms.end,
        })
    }
}

impl Resolvable for PolicyRecord {
    type Id = ObligationId;
    const KIND: &'static str = "policy";

    fn record_id(&self) -> &ObligationId {
        &self.id
    }
}

impl RecordSource<PolicyRecord> for Transaction<'_> {
    fn fetch(&self, id: &ObligationId) -> Option<PolicyRecord> {
        self.get(id)
            .filter(|r| r.kind == ObligationKind::Policy)
            .and_then(PolicyRecord::from_obligation)
    }
}

impl RecordSource<PolicyRecord> for ObligationStore {
    fn fetch(&self, id: &ObligationId) -> Option<PolicyRecord> {
        self.try_get(id, SIBLING_READ_WAIT)
            .filter(|r| r.kind == ObligationKind::Policy)
            .and_then(|r| PolicyRecord::from_obligation(&r))
    }

    fn backing_store(&self) -> Option<&ObligationStore> {
        Some(self)
    }
}

/// Where the engine resolves policies from.
#[derive(Clone, Default)]
pub enum PolicySource {
    /// The engine's own store, read through the current transaction.
    #[default]
    Local,
    /// A sibling component.
    External(Arc<dyn RecordSource<PolicyRecord>>),
}

impl fmt::Debug for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("Local"),
            Self::External(_) => f.write_str("External(..)"),
        }
    }
}

impl PolicySource {
    /// Whether resolving through this source would read `store`.
    pub(crate) fn reads_store(&self, store: &ObligationStore) -> bool {
        match self {
            Self::Local => false,
            Self::External(source) => source
                .backing_store()
                .is_some_and(|s| s.same_store(store)),
        }
    }

    /// Resolve `id`, reading local policies through `tx`.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn resolve(&self, tx: &Transaction<'_>, id: &ObligationId) -> Result<PolicyRecord, EngineError> {
        match self {
            Self::Local => resolve(tx, id),
            Self::External(source) => resolve(source.as_ref(), id),
        }
    }
}
