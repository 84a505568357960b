//! Contract templates: reusable contract shapes with a fixed signatory
//! count and an agreed body digest.

use serde::{Deserialize, Serialize};

use covenant_core::{ContentDigest, JurisdictionCode, PartyAddress, TemplateId, Timestamp};

/// A registered contract template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTemplate {
    /// Identifier.
    pub id: TemplateId,
    /// Registering address. Only the author may deactivate.
    pub author: PartyAddress,
    /// Display name.
    pub name: String,
    /// Jurisdiction every instance is created in.
    pub jurisdiction: JurisdictionCode,
    /// Exact number of signatories an instance must list.
    pub required_signatories: usize,
    /// Digest of the template body text.
    pub body_digest: ContentDigest,
    /// Inactive templates cannot be instantiated.
    pub active: bool,
    /// Registration time.
    pub created_at: Timestamp,
}
