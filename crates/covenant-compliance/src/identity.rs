//! # Identity Service
//!
//! `is_verified(address, jurisdiction, level) -> bool`. Levels are
//! ordered; an address verified at `full` also satisfies `basic`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use covenant_core::{JurisdictionCode, PartyAddress};

use crate::error::ComplianceError;

/// Depth of identity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// Name and address checked.
    #[default]
    Basic,
    /// Documents checked.
    Enhanced,
    /// In-person or biometric check.
    Full,
}

impl VerificationLevel {
    /// The canonical `snake_case` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Enhanced => "enhanced",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationLevel {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "enhanced" => Ok(Self::Enhanced),
            "full" => Ok(Self::Full),
            _ => Err(ComplianceError::UnknownLevel(s.to_string())),
        }
    }
}

/// Answers whether a party may act in a jurisdiction.
pub trait IdentityService: Send + Sync {
    /// Whether `address` is verified for `jurisdiction` at `level` or above.
    fn is_verified(
        &self,
        address: &PartyAddress,
        jurisdiction: &JurisdictionCode,
        level: VerificationLevel,
    ) -> bool;
}

/// In-memory identity store keyed by (address, jurisdiction).
#[derive(Debug, Default)]
pub struct InMemoryIdentityService {
    levels: RwLock<HashMap<(PartyAddress, JurisdictionCode), VerificationLevel>>,
}

impl InMemoryIdentityService {
    /// An empty store; nobody is verified.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address` as verified at `level` in `jurisdiction`.
    pub fn verify(&self, address: PartyAddress, jurisdiction: JurisdictionCode, level: VerificationLevel) {
        tracing::debug!(party = %address, jurisdiction = %jurisdiction, level = %level, "identity verified");
        self.levels.write().insert((address, jurisdiction), level);
    }

    /// Withdraw a verification.
    pub fn revoke(&self, address: &PartyAddress, jurisdiction: &JurisdictionCode) {
        self.levels
            .write()
            .remove(&(address.clone(), jurisdiction.clone()));
    }
}

impl IdentityService for InMemoryIdentityService {
    fn is_verified(
        &self,
        address: &PartyAddress,
        jurisdiction: &JurisdictionCode,
        level: VerificationLevel,
    ) -> bool {
        self.levels
            .read()
            .get(&(address.clone(), jurisdiction.clone()))
            .is_some_and(|held| *held >= level)
    }
}
