//! Errors raised while configuring compliance collaborators.

use thiserror::Error;

/// A configuration value the compliance crate could not accept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplianceError {
    /// Unknown identity verification level name.
    #[error("unknown verification level {0:?} (expected basic, enhanced or full)")]
    UnknownLevel(String),
    /// Operation tag not of the form `<kind>.<operation>`.
    #[error("malformed operation tag {0:?}")]
    MalformedTag(String),
}
