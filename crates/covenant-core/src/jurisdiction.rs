//! # Jurisdiction Codes
//!
//! A jurisdiction code identifies the legal context an obligation is created
//! under. It is immutable after creation and is the key every compliance
//! collaborator is consulted with.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A jurisdiction code, typically an ISO 3166 code or a zone identifier
/// (e.g. `"US-NY"`, `"AE-DIFC"`).
///
/// Must be non-empty; no further format is imposed because registries name
/// jurisdictions differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JurisdictionCode(String);

impl JurisdictionCode {
    /// Create a jurisdiction code, validating non-emptiness.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidJurisdictionCode`] if the string is
    /// empty or whitespace-only.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::InvalidJurisdictionCode);
        }
        Ok(Self(s))
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JurisdictionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JurisdictionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JurisdictionCode> for String {
    fn from(code: JurisdictionCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jurisdiction_code_valid() {
        let code = JurisdictionCode::new("US-NY").unwrap();
        assert_eq!(code.as_str(), "US-NY");
        assert_eq!(code.to_string(), "US-NY");
    }

    #[test]
    fn jurisdiction_code_rejects_empty() {
        assert!(JurisdictionCode::new("").is_err());
        assert!(JurisdictionCode::new("   ").is_err());
    }

    #[test]
    fn jurisdiction_code_deserialize_validates() {
        let bad: Result<JurisdictionCode, _> = serde_json::from_str("\" \"");
        assert!(bad.is_err());
    }
}
