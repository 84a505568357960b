//! Engine configuration.
//!
//! Defaults suit a single-zone deployment. Override via environment
//! variables or explicit construction; scenario files may embed the same
//! fields under an `engine:` key.

use serde::{Deserialize, Serialize};

use covenant_compliance::VerificationLevel;

/// Tunable bounds of the obligation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on required signatories per contract. Bounds the
    /// per-attestation completeness scan.
    pub max_signatories: usize,
    /// Upper bound on the caller-supplied reference string, in bytes.
    pub max_reference_len: usize,
    /// Identity level every party must hold in the obligation's
    /// jurisdiction at creation.
    pub required_identity_level: VerificationLevel,
    /// Upper bound on documents linked at creation.
    pub max_linked_documents: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_signatories: 16,
            max_reference_len: 256,
            required_identity_level: VerificationLevel::Basic,
            max_linked_documents: 32,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `COVENANT_MAX_SIGNATORIES` (default: 16)
    /// - `COVENANT_MAX_REFERENCE_LEN` (default: 256)
    /// - `COVENANT_IDENTITY_LEVEL` (default: `basic`)
    /// - `COVENANT_MAX_LINKED_DOCUMENTS` (default: 32)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_signatories: env_usize(&lookup, "COVENANT_MAX_SIGNATORIES", defaults.max_signatories)?,
            max_reference_len: env_usize(
                &lookup,
                "COVENANT_MAX_REFERENCE_LEN",
                defaults.max_reference_len,
            )?,
            required_identity_level: match lookup("COVENANT_IDENTITY_LEVEL") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("COVENANT_IDENTITY_LEVEL".to_string(), raw))?,
                None => defaults.required_identity_level,
            },
            max_linked_documents: env_usize(
                &lookup,
                "COVENANT_MAX_LINKED_DOCUMENTS",
                defaults.max_linked_documents,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that would make every creation fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_signatories == 0 {
            return Err(ConfigError::Invalid(
                "max_signatories".to_string(),
                "0".to_string(),
            ));
        }
        if self.max_reference_len == 0 {
            return Err(ConfigError::Invalid(
                "max_reference_len".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var.to_string(), raw)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed or is out of range.
    #[error("invalid value for {0}: {1:?}")]
    Invalid(String, String),
}
