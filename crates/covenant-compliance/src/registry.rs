//! # Jurisdiction Registry
//!
//! `is_active(code) -> bool`. An obligation can only be created in an
//! active jurisdiction; existing obligations are unaffected when a
//! jurisdiction is later deactivated.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use covenant_core::JurisdictionCode;

/// Source of truth for which jurisdictions accept new obligations.
pub trait JurisdictionRegistry: Send + Sync {
    /// Whether `code` is currently active.
    fn is_active(&self, code: &JurisdictionCode) -> bool;
}

/// In-process registry. Unknown codes are inactive.
#[derive(Debug, Default)]
pub struct StaticJurisdictionRegistry {
    entries: RwLock<BTreeMap<JurisdictionCode, bool>>,
}

impl StaticJurisdictionRegistry {
    /// A registry with `codes` active.
    pub fn with_active(codes: impl IntoIterator<Item = JurisdictionCode>) -> Self {
        Self {
            entries: RwLock::new(codes.into_iter().map(|c| (c, true)).collect()),
        }
    }

    /// Mark `code` active, registering it if needed.
    pub fn activate(&self, code: JurisdictionCode) {
        tracing::info!(jurisdiction = %code, "jurisdiction activated");
        self.entries.write().insert(code, true);
    }

    /// Mark `code` inactive. It stays registered.
    pub fn deactivate(&self, code: &JurisdictionCode) {
        if let Some(active) = self.entries.write().get_mut(code) {
            *active = false;
            tracing::info!(jurisdiction = %code, "jurisdiction deactivated");
        }
    }

    /// Registered codes with their activity flag.
    pub fn snapshot(&self) -> Vec<(JurisdictionCode, bool)> {
        self.entries
            .read()
            .iter()
            .map(|(c, a)| (c.clone(), *a))
            .collect()
    }
}

impl JurisdictionRegistry for StaticJurisdictionRegistry {
    fn is_active(&self, code: &JurisdictionCode) -> bool {
        self.entries.read().get(code).copied().unwrap_or(false)
    }
}
