use serde::{Deserialize, Serialize};
use serde_json::Value;

use formpatch_diff::{Diagnostic, DiffOptions, JsonPatch};

/// A document as stored by the server, with a version bumped on every
/// accepted write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub version: u64,
    pub data: Value,
}

impl VersionedDocument {
    pub fn new(version: u64, data: Value) -> Self {
        Self { version, data }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Re-fetch and retry this many times after a failed precondition.
    pub max_retries: u32,
    pub diff: DiffOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            diff: DiffOptions::default(),
        }
    }
}

/// A save that has been prepared but not yet acknowledged.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSave {
    /// Version of the document the patch was computed against.
    pub base_version: u64,
    pub patch: JsonPatch,
    pub diagnostics: Vec<Diagnostic>,
}

/// Summary of a completed save.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SaveReport {
    /// Version the server assigned.
    pub version: u64,
    pub attempts: u32,
    /// Findings from merging the response into the live document.
    pub diagnostics: Vec<Diagnostic>,
}
