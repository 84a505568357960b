//! # Entity Store
//!
//! Obligation records, by-party indexes, contract templates, and the event
//! log behind one `parking_lot::RwLock`.
//!
//! Mutations go through [`ObligationStore::transact`]: the closure reads
//! through a [`Transaction`] that overlays staged writes on the committed
//! state, and everything it staged is applied in one step only if it
//! returns `Ok`. An `Err` drops the staging area, so a failed operation
//! leaves no trace. The write lock is held for the whole closure, which
//! serializes mutations end to end.
//!
//! Readers take the read lock and therefore only ever see committed
//! snapshots. [`ObligationStore::try_get`] gives up after a bounded wait,
//! for callers that may themselves be inside another store's transaction.
//!
//! Indexes are append-only: an obligation is never removed from a party's
//! list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use covenant_core::{ObligationId, PartyAddress, TemplateId};
use covenant_state::{Obligation, ObligationKind};

use crate::error::EngineError;
use crate::events::ObligationEvent;
use crate::templates::ContractTemplate;

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<ObligationId, Obligation>,
    order: Vec<ObligationId>,
    by_party: HashMap<PartyAddress, Vec<ObligationId>>,
    templates: HashMap<TemplateId, ContractTemplate>,
    events: Vec<ObligationEvent>,
    nonce: u64,
}

/// Thread-safe, cloneable handle on the obligation store.
#[derive(Debug, Clone, Default)]
pub struct ObligationStore {
    state: Arc<RwLock<StoreState>>,
}

impl ObligationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one atomic mutation.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns; nothing it staged is kept.
    pub fn transact<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut guard = self.state.write();
        let (result, staged) = {
            let mut tx = Transaction::new(&guard);
            let result = f(&mut tx)?;
            (result, tx.into_staged())
        };
        guard.apply(staged);
        Ok(result)
    }

    /// Committed record by id.
    pub fn get(&self, id: &ObligationId) -> Option<Obligation> {
        self.state.read().records.get(id).cloned()
    }

    /// [`get`](Self::get), waiting at most `wait` for the read lock.
    ///
    /// `None` when the lock stays write-held, e.g. when called from inside
    /// a transaction on this same store.
    pub fn try_get(&self, id: &ObligationId, wait: Duration) -> Option<Obligation> {
        let Some(state) = self.state.try_read_for(wait) else {
            tracing::warn!(%id, wait_ms = wait.as_millis() as u64, "store lock busy, read abandoned");
            return None;
        };
        state.records.get(id).cloned()
    }

    /// Whether `other` is a handle on this same store.
    pub(crate) fn same_store(&self, other: &ObligationStore) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Every committed record, in creation order.
    pub fn list(&self) -> Vec<Obligation> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect()
    }

    /// Records in which `address` holds any role, in creation order.
    pub fn list_by_party(&self, address: &PartyAddress) -> Vec<Obligation> {
        let state = self.state.read();
        state
            .by_party
            .get(address)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Committed template by id.
    pub fn template(&self, id: &TemplateId) -> Option<ContractTemplate> {
        self.state.read().templates.get(id).cloned()
    }

    /// Events of one obligation, oldest first.
    pub fn events_for(&self, id: &ObligationId) -> Vec<ObligationEvent> {
        self.state
            .read()
            .events
            .iter()
            .filter(|e| &e.obligation == id)
            .cloned()
            .collect()
    }

    /// The whole event log.
    pub fn events(&self) -> Vec<ObligationEvent> {
        self.state.read().events.clone()
    }

    /// Number of committed obligations.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether no obligation has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Staged writes of one mutation, overlaid on the committed state.
#[derive(Debug)]
pub struct Transaction<'a> {
    base: &'a StoreState,
    staged: HashMap<ObligationId, Obligation>,
    inserted: Vec<ObligationId>,
    templates: HashMap<TemplateId, ContractTemplate>,
    events: Vec<ObligationEvent>,
    nonce: u64,
}

struct Staged {
    staged: HashMap<ObligationId, Obligation>,
    inserted: Vec<ObligationId>,
    templates: HashMap<TemplateId, ContractTemplate>,
    events: Vec<ObligationEvent>,
    nonce: u64,
}

impl<'a> Transaction<'a> {
    fn new(base: &'a StoreState) -> Self {
        Self {
            base,
            staged: HashMap::new(),
            inserted: Vec::new(),
            templates: HashMap::new(),
            events: Vec::new(),
            nonce: base.nonce,
        }
    }

    fn into_staged(self) -> Staged {
        Staged {
            staged: self.staged,
            inserted: self.inserted,
            templates: self.templates,
            events: self.events,
            nonce: self.nonce,
        }
    }

    /// Record by id, staged version first.
    pub fn get(&self, id: &ObligationId) -> Option<&Obligation> {
        self.staged.get(id).or_else(|| self.base.records.get(id))
    }

    /// Owned copy of a record, for modification and [`put`](Self::put).
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownObligation`].
    pub fn load(&self, id: &ObligationId) -> Result<Obligation, EngineError> {
        self.get(id)
            .cloned()
            .ok_or(EngineError::UnknownObligation(*id))
    }

    /// [`load`](Self::load), requiring a kind.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownObligation`] or [`EngineError::WrongKind`].
    pub fn load_kind(
        &self,
        id: &ObligationId,
        kind: ObligationKind,
    ) -> Result<Obligation, EngineError> {
        let record = self.load(id)?;
        if record.kind != kind {
            return Err(EngineError::WrongKind {
                id: *id,
                actual: record.kind,
                expected: kind,
            });
        }
        Ok(record)
    }

    /// Next value of the store-wide creation counter.
    pub fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    /// Stage a new record.
    ///
    /// # Errors
    ///
    /// [`EngineError::IdCollision`] if the id is already taken.
    pub fn insert(&mut self, record: Obligation) -> Result<(), EngineError> {
        if self.get(&record.id).is_some() {
            return Err(EngineError::IdCollision(record.id));
        }
        self.inserted.push(record.id);
        self.staged.insert(record.id, record);
        Ok(())
    }

    /// Stage a modified record.
    pub fn put(&mut self, record: Obligation) {
        self.staged.insert(record.id, record);
    }

    /// Stage an event.
    pub fn record(&mut self, event: ObligationEvent) {
        self.events.push(event);
    }

    /// Template by id, staged version first.
    pub fn template(&self, id: &TemplateId) -> Option<&ContractTemplate> {
        self.templates.get(id).or_else(|| self.base.templates.get(id))
    }

    /// Stage a new or modified template.
    pub fn put_template(&mut self, template: ContractTemplate) {
        self.templates.insert(template.id, template);
    }
}

impl StoreState {
    fn apply(&mut self, staged: Staged) {
        for id in &staged.inserted {
            self.order.push(*id);
            if let Some(record) = staged.staged.get(id) {
                for address in record.addresses() {
                    self.by_party.entry(address.clone()).or_default().push(*id);
                }
            }
        }
        self.records.extend(staged.staged);
        self.templates.extend(staged.templates);
        let base = self.events.len() as u64;
        for (i, mut event) in staged.events.into_iter().enumerate() {
            event.sequence = base + i as u64 + 1;
            self.events.push(event);
        }
        self.nonce = staged.nonce;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{
        sha256_digest, Amount, CanonicalBytes, JurisdictionCode, Timestamp,
    };
    use covenant_state::{
        BillTerms, ObligationStatus, Party, PaymentMethod, Role, Terms,
    };

    fn addr(s: &str) -> PartyAddress {
        PartyAddress::new(s).unwrap()
    }

    fn bill(reference: &str) -> Obligation {
        let t = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let id = ObligationId::from_digest(sha256_digest(
            &CanonicalBytes::new(&serde_json::json!({ "r": reference })).unwrap(),
        ));
        Obligation {
            id,
            kind: ObligationKind::Bill,
            created_by: addr("alice"),
            parties: vec![
                Party::new(addr("alice"), Role::Payer),
                Party::new(addr("bob"), Role::Payee),
            ],
            status: ObligationStatus::Created,
            jurisdiction: JurisdictionCode::new("sg").unwrap(),
            reference: reference.to_string(),
            terms: Terms::Bill(BillTerms {
                amount: Amount::new(100),
                due_date: t,
                method: PaymentMethod::Card,
                method_data: String::new(),
                description: String::new(),
                recurrence: None,
            }),
            linked_records: Vec::new(),
            signatures: None,
            created_at: t,
            updated_at: t,
            history: Vec::new(),
        }
    }

    #[test]
    fn commit_indexes_every_party() {
        let store = ObligationStore::new();
        let b = bill("b-1");
        let id = b.id;
        store.transact(|tx| tx.insert(b)).unwrap();
        assert_eq!(store.list_by_party(&addr("alice"))[0].id, id);
        assert_eq!(store.list_by_party(&addr("bob"))[0].id, id);
        assert!(store.list_by_party(&addr("carol")).is_empty());
    }

    #[test]
    fn failed_transaction_leaves_nothing() {
        let store = ObligationStore::new();
        let result: Result<(), EngineError> = store.transact(|tx| {
            tx.insert(bill("b-1"))?;
            tx.next_nonce();
            Err(EngineError::invalid("test", "abort"))
        });
        assert!(result.is_err());
        assert!(store.is_empty());
        assert!(store.list_by_party(&addr("alice")).is_empty());
        // The nonce did not advance either.
        let n = store.transact(|tx| Ok(tx.next_nonce())).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn insert_rejects_existing_id() {
        let store = ObligationStore::new();
        store.transact(|tx| tx.insert(bill("b-1"))).unwrap();
        let err = store.transact(|tx| tx.insert(bill("b-1"))).unwrap_err();
        assert!(matches!(err, EngineError::IdCollision(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn staged_reads_see_own_writes() {
        let store = ObligationStore::new();
        let b = bill("b-1");
        let id = b.id;
        store.transact(|tx| tx.insert(b)).unwrap();
        store
            .transact(|tx| {
                let mut r = tx.load(&id)?;
                r.status = ObligationStatus::Pending;
                tx.put(r);
                assert_eq!(tx.get(&id).unwrap().status, ObligationStatus::Pending);
                Ok(())
            })
            .unwrap();
        assert_eq!(store.get(&id).unwrap().status, ObligationStatus::Pending);
        // Index entries are not duplicated by updates.
        assert_eq!(store.list_by_party(&addr("alice")).len(), 1);
    }

    #[test]
    fn bounded_read_gives_up_inside_own_transaction() {
        let store = ObligationStore::new();
        let b = bill("b-1");
        let id = b.id;
        store.transact(|tx| tx.insert(b)).unwrap();
        let wait = Duration::from_millis(20);
        assert!(store.try_get(&id, wait).is_some());
        let inner = store.clone();
        store
            .transact(|_| {
                assert!(inner.try_get(&id, wait).is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn same_store_compares_handles() {
        let store = ObligationStore::new();
        assert!(store.same_store(&store.clone()));
        assert!(!store.same_store(&ObligationStore::new()));
    }

    #[test]
    fn load_kind_checks_kind() {
        let store = ObligationStore::new();
        let b = bill("b-1");
        let id = b.id;
        store.transact(|tx| tx.insert(b)).unwrap();
        let err = store
            .transact(|tx| tx.load_kind(&id, ObligationKind::Policy))
            .unwrap_err();
        assert!(matches!(err, EngineError::WrongKind { .. }));
    }

    #[test]
    fn events_get_sequential_numbers() {
        let store = ObligationStore::new();
        let b = bill("b-1");
        let id = b.id;
        let t = b.created_at;
        store
            .transact(|tx| {
                tx.insert(b)?;
                tx.record(ObligationEvent::created(
                    id,
                    ObligationKind::Bill,
                    ObligationStatus::Created,
                    addr("alice"),
                    t,
                ));
                Ok(())
            })
            .unwrap();
        let events = store.events_for(&id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
    }
}
