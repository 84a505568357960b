//! Supply-chain item registry. Verification requests hold only an
//! [`ItemId`]; the item's owner is looked up here through the resolver.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use covenant_core::{ItemId, PartyAddress};

use crate::resolver::{RecordSource, Resolvable};

/// A registered supply-chain item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item identifier.
    pub id: ItemId,
    /// Current owner; the only address that may request verification.
    pub owner: PartyAddress,
    /// Free-text description.
    pub description: String,
}

impl Resolvable for ItemRecord {
    type Id = ItemId;
    const KIND: &'static str = "item";

    fn record_id(&self) -> &ItemId {
        &self.id
    }
}

/// In-memory item registry.
#[derive(Debug, Default)]
pub struct InMemoryItemRegistry {
    items: RwLock<HashMap<ItemId, ItemRecord>>,
}

impl InMemoryItemRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an item.
    pub fn register(&self, item: ItemRecord) {
        self.items.write().insert(item.id.clone(), item);
    }

    /// Change an item's owner. Returns `false` for unknown items.
    pub fn transfer(&self, id: &ItemId, owner: PartyAddress) -> bool {
        match self.items.write().get_mut(id) {
            Some(item) => {
                item.owner = owner;
                true
            }
            None => false,
        }
    }
}

impl RecordSource<ItemRecord> for InMemoryItemRegistry {
    fn fetch(&self, id: &ItemId) -> Option<ItemRecord> {
        self.items.read().get(id).cloned()
    }
}
