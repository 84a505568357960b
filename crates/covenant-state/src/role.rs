//! # Roles and Parties
//!
//! A party is an address holding one role on an obligation. One address may
//! hold several roles (a contract creator who also signs, for instance), in
//! which case it appears once per role.

use serde::{Deserialize, Serialize};

use covenant_core::PartyAddress;

/// A role an address can hold on an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Initiator of a contract. Does not sign.
    Creator,
    /// Pays a bill or subscription.
    Payer,
    /// Receives a bill or subscription payment (merchant).
    Payee,
    /// Underwrites a policy; reviews and pays claims.
    Insurer,
    /// Covered party on a policy.
    Beneficiary,
    /// Raised a claim.
    Claimant,
    /// Must attest to a contract.
    Signatory,
    /// Raised a verification request.
    Requester,
    /// Assesses a verification request.
    Verifier,
}

impl Role {
    /// The canonical `snake_case` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Payer => "payer",
            Self::Payee => "payee",
            Self::Insurer => "insurer",
            Self::Beneficiary => "beneficiary",
            Self::Claimant => "claimant",
            Self::Signatory => "signatory",
            Self::Requester => "requester",
            Self::Verifier => "verifier",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address with the role it holds on one obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    /// The participant.
    pub address: PartyAddress,
    /// What the participant may do.
    pub role: Role,
}

impl Party {
    /// Pair an address with a role.
    pub fn new(address: PartyAddress, role: Role) -> Self {
        Self { address, role }
    }
}
