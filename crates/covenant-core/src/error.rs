//! # Error Hierarchy
//!
//! Validation and canonicalization errors for the foundational types.
//! Each variant carries the rejected input so operators can see what was
//! wrong without reproducing the call.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be integers in minor units.
    #[error("float values are not permitted in canonical representations; use integer minor units: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes and caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Party address is empty or contains whitespace.
    #[error("invalid party address: \"{0}\" (expected a non-empty token without whitespace)")]
    InvalidAddress(String),

    /// Jurisdiction code is empty.
    #[error("invalid jurisdiction code: must be non-empty")]
    InvalidJurisdictionCode,

    /// Obligation id is not `obl:` followed by 64 lowercase hex characters.
    #[error("invalid obligation id: \"{0}\"")]
    InvalidObligationId(String),

    /// Digest is not 64 lowercase hex characters.
    #[error("invalid digest: \"{0}\"")]
    InvalidDigest(String),

    /// Amount must be strictly positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(u64),

    /// Interval must be strictly positive.
    #[error("interval must be positive")]
    NonPositiveInterval,

    /// A date that must lie in the future does not.
    #[error("{field} must be after {reference}, got {value}")]
    NotInFuture {
        /// Name of the offending field.
        field: String,
        /// The rejected value (ISO 8601).
        value: String,
        /// The instant it had to exceed (ISO 8601).
        reference: String,
    },

    /// A required free-text field is empty.
    #[error("{0} must not be empty")]
    EmptyField(String),

    /// A free-text field exceeds its configured bound.
    #[error("{field} exceeds {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: String,
        /// Configured maximum length.
        max: usize,
    },

    /// A collection has an out-of-range number of members.
    #[error("{field} must contain between {min} and {max} entries, got {actual}")]
    CountOutOfRange {
        /// Name of the offending collection.
        field: String,
        /// Minimum allowed count.
        min: usize,
        /// Maximum allowed count.
        max: usize,
        /// Count supplied by the caller.
        actual: usize,
    },

    /// A collection contains the same address twice.
    #[error("duplicate party {0}")]
    DuplicateParty(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Arithmetic on a timestamp left the representable range.
    #[error("timestamp overflow adding {seconds}s to {base}")]
    TimestampOverflow {
        /// The base instant.
        base: String,
        /// The offset that overflowed.
        seconds: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_error_float_rejected() {
        let err = CanonicalizationError::FloatRejected(3.14);
        let msg = format!("{err}");
        assert!(msg.contains("float values are not permitted"));
        assert!(msg.contains("3.14"));
    }

    #[test]
    fn validation_error_not_in_future_names_field() {
        let err = ValidationError::NotInFuture {
            field: "due_date".to_string(),
            value: "2026-01-01T00:00:00Z".to_string(),
            reference: "2026-01-02T00:00:00Z".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("due_date"));
        assert!(msg.contains("2026-01-02T00:00:00Z"));
    }

    #[test]
    fn validation_error_count_out_of_range() {
        let err = ValidationError::CountOutOfRange {
            field: "signatories".to_string(),
            min: 1,
            max: 16,
            actual: 20,
        };
        assert!(format!("{err}").contains("between 1 and 16"));
    }

    #[test]
    fn validation_error_invalid_address() {
        let err = ValidationError::InvalidAddress("a b".to_string());
        assert!(format!("{err}").contains("a b"));
    }
}
