//! # Identity Newtypes
//!
//! Identifiers for obligations, parties, and the side records obligations
//! link to. Each identifier is a distinct type.
//!
//! - [`ObligationId`] is content-derived: the SHA-256 of the canonical
//!   creation seed (see `covenant-engine`), rendered `obl:<64 hex>`.
//! - [`PartyAddress`] is an opaque ledger address, validated non-empty and
//!   whitespace-free.
//! - [`PaymentId`], [`DocumentId`] and [`TemplateId`] are random v4 UUIDs.
//! - [`ItemId`] names a supply-chain item owned by the external item registry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Obligation identifier
// ---------------------------------------------------------------------------

/// Globally unique, content-derived obligation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObligationId(ContentDigest);

impl ObligationId {
    const PREFIX: &'static str = "obl:";

    /// Wrap a digest computed over a canonical creation seed.
    pub fn from_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    /// Access the underlying digest.
    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }

    /// Parse the `obl:<hex>` textual form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidObligationId`] when the prefix or the
    /// hex body is malformed.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        s.strip_prefix(Self::PREFIX)
            .and_then(ContentDigest::from_hex)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidObligationId(s.to_string()))
    }
}

impl std::fmt::Display for ObligationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0.to_hex())
    }
}

impl std::str::FromStr for ObligationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObligationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObligationId> for String {
    fn from(id: ObligationId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// Party address
// ---------------------------------------------------------------------------

/// A participant's ledger address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyAddress(String);

impl PartyAddress {
    /// Create an address, rejecting empty or whitespace-bearing input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidAddress(s));
        }
        Ok(Self(s))
    }

    /// Access the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartyAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PartyAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartyAddress> for String {
    fn from(addr: PartyAddress) -> Self {
        addr.0
    }
}

// ---------------------------------------------------------------------------
// UUID-based side-record identifiers
// ---------------------------------------------------------------------------

/// Identifier of a payment issued by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Create a new random payment identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "payment:{}", self.0)
    }
}

/// Identifier of a document held by the document registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "document:{}", self.0)
    }
}

/// Identifier of a legal contract template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(Uuid);

impl TemplateId {
    /// Create a new random template identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template:{}", self.0)
    }
}

/// Identifier of a supply-chain item in the external item registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Create an item identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] for empty input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyField("item_id".to_string()));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item:{}", self.0)
    }
}
