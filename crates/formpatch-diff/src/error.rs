//! Error types for the diff crate.

use std::fmt;

use formpatch_types::ValueKind;

/// Which of the input snapshots an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Snapshot {
    Previous,
    Next,
    Current,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Previous => "previous",
            Self::Next => "next",
            Self::Current => "current",
        })
    }
}

/// Errors that can occur during diff operations.
///
/// Only caller contract violations are errors; every well-formed set of
/// documents produces a patch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// A root document was not an object.
    #[error("{snapshot} document must be an object at the root, got {actual}")]
    RootNotObject {
        snapshot: Snapshot,
        actual: ValueKind,
    },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
