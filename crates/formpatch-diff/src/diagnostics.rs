//! Non-fatal findings gathered while diffing.
//!
//! The engine never logs through a global channel alone: every finding is
//! returned to the caller in [`crate::DiffOutcome::diagnostics`], and is also
//! emitted as a `tracing` event.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use formpatch_types::JsonPointer;

/// What was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Two compared rows both lacked the identifier; rows were matched by
    /// deep equality, so field edits show up as whole-row changes.
    MissingRowId { key: String },
    /// Only one of two compared rows carried the identifier; they were
    /// treated as different rows.
    PartialRowId { key: String },
    /// The live document diverged from the baseline at this path in a way
    /// that conflicts with the new value; the write was dropped.
    ConcurrentEditKept,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRowId { key } => {
                write!(f, "array rows lack the {key:?} identifier; matching by value")
            }
            Self::PartialRowId { key } => {
                write!(f, "only one of two rows carries the {key:?} identifier")
            }
            Self::ConcurrentEditKept => f.write_str("kept concurrent edit; dropped conflicting write"),
        }
    }
}

/// A finding at an array or value path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: JsonPointer,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_root() {
            "/".to_string()
        } else {
            self.path.to_string()
        };
        write!(f, "{path}: {}", self.kind)
    }
}

/// Collector for diagnostics, deduplicated by path and kind.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding once per path and kind.
    pub fn record(&mut self, path: &JsonPointer, kind: DiagnosticKind) {
        if self
            .entries
            .iter()
            .any(|d| d.kind == kind && &d.path == path)
        {
            return;
        }
        match kind {
            DiagnosticKind::ConcurrentEditKept => debug!(path = %path, "{kind}"),
            _ => warn!(path = %path, "{kind}"),
        }
        self.entries.push(Diagnostic {
            path: path.clone(),
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
