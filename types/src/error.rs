//! Error classification shared across crates.
//!
//! Every crate keeps its own `thiserror` enum; this module only defines the
//! common taxonomy so callers can react to the class of a failure without
//! matching on every component's variants.

use std::fmt;

/// The class of a failed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// The operation is illegal in the entity's current status.
    State,
    /// Wrong caller role, unverified caller, or halted platform.
    Authorization,
    /// Insufficient funds, stake, or balance.
    Resource,
    /// Oracle, token transfer, or storage backend failure.
    External,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Authorization => "authorization",
            Self::Resource => "resource",
            Self::External => "external",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error enum in the workspace.
pub trait ErrorCode {
    /// The taxonomy class of this error.
    fn kind(&self) -> ErrorKind;

    /// A stable machine-readable code naming the violated invariant.
    fn code(&self) -> &'static str;
}
