//! # Document Registry
//!
//! `link(document, subject, tag)`, called once per caller-supplied document
//! at creation. Linking is fire-and-forget: a failure is logged and the
//! creation still succeeds.

use parking_lot::RwLock;
use thiserror::Error;

use covenant_core::{DocumentId, ObligationId};

/// Why a link was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document link refused: {0}")]
pub struct DocumentError(pub String);

/// Associates documents with obligations.
pub trait DocumentRegistry: Send + Sync {
    /// Link `document` to `subject` under `tag` (the obligation kind).
    fn link(
        &self,
        document: &DocumentId,
        subject: &ObligationId,
        tag: &str,
    ) -> Result<(), DocumentError>;
}

/// In-memory link table.
#[derive(Debug, Default)]
pub struct InMemoryDocumentRegistry {
    links: RwLock<Vec<(DocumentId, ObligationId, String)>>,
}

impl InMemoryDocumentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents linked to `subject`, in link order.
    pub fn documents_for(&self, subject: &ObligationId) -> Vec<DocumentId> {
        self.links
            .read()
            .iter()
            .filter(|(_, s, _)| s == subject)
            .map(|(d, _, _)| *d)
            .collect()
    }
}

impl DocumentRegistry for InMemoryDocumentRegistry {
    fn link(
        &self,
        document: &DocumentId,
        subject: &ObligationId,
        tag: &str,
    ) -> Result<(), DocumentError> {
        self.links
            .write()
            .push((*document, *subject, tag.to_string()));
        Ok(())
    }
}
