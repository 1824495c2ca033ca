//! Error types for patch application.

use serde_json::Value;

use formpatch_types::{JsonPointer, ValueKind};

/// Errors that can occur while applying a patch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    /// A path (or its parent) does not exist in the document.
    #[error("path not found: {path}")]
    PathNotFound { path: JsonPointer },

    /// An array segment is not a valid index.
    #[error("invalid array index {segment:?} at {path}")]
    InvalidIndex { path: JsonPointer, segment: String },

    /// An array index is past the end of the array.
    #[error("index {index} out of bounds (len {len}) at {path}")]
    IndexOutOfBounds {
        path: JsonPointer,
        index: usize,
        len: usize,
    },

    /// The parent of a path is a scalar.
    #[error("cannot address into a {kind} at {path}")]
    NotAContainer { path: JsonPointer, kind: ValueKind },

    /// The document root cannot be removed.
    #[error("cannot remove the document root")]
    RemoveRoot,

    /// A `test` operation did not hold.
    #[error("test failed at {path}: expected {expected}, found {}", display_actual(.actual))]
    TestFailed {
        path: JsonPointer,
        expected: Value,
        actual: Option<Value>,
    },
}

impl PatchError {
    /// Returns `true` if the patch was well-formed but a precondition on the
    /// target document did not hold.
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, Self::TestFailed { .. })
    }
}

fn display_actual(actual: &Option<Value>) -> String {
    match actual {
        Some(value) => value.to_string(),
        None => "nothing".to_string(),
    }
}

/// Convenience alias for patch results.
pub type PatchResult<T> = Result<T, PatchError>;
