//! Diff configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use formpatch_types::{JsonPointer, TypeError};

/// Property carried by every repeating-group row unless configured otherwise.
pub const DEFAULT_ROW_ID_KEY: &str = "altinnRowId";

const WILDCARD: &str = "*";

/// Options controlling how documents are compared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Stable identifier property on array-of-object elements.
    pub row_id_key: String,
    /// Which arrays are compared as opaque values instead of row sequences.
    pub leaf_arrays: LeafArrayPolicy,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            row_id_key: DEFAULT_ROW_ID_KEY.to_string(),
            leaf_arrays: LeafArrayPolicy::default(),
        }
    }
}

impl DiffOptions {
    pub fn with_row_id_key(mut self, key: impl Into<String>) -> Self {
        self.row_id_key = key.into();
        self
    }

    pub fn with_leaf_array_paths(mut self, patterns: Vec<PathPattern>) -> Self {
        self.leaf_arrays = LeafArrayPolicy::Paths(patterns);
        self
    }
}

/// Rule for treating an array as a single value rather than a row sequence.
///
/// Leaf arrays are replaced as a whole in two-way diffs, and only ever
/// unioned into a concurrently changed array in three-way diffs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "paths", rename_all = "snake_case")]
pub enum LeafArrayPolicy {
    /// Any non-empty array whose new value holds only strings (identifier
    /// lists such as attachment IDs).
    ///
    /// An empty new value is not a leaf. Emptying a string list is diffed as
    /// a sequence and removes each entry, rather than removing the path.
    #[default]
    AllStrings,
    /// Exactly the arrays whose path matches one of the patterns.
    Paths(Vec<PathPattern>),
}

impl LeafArrayPolicy {
    /// Whether the array at `path`, about to become `next`, is a leaf.
    pub fn is_leaf(&self, path: &JsonPointer, next: &[Value]) -> bool {
        match self {
            Self::AllStrings => !next.is_empty() && next.iter().all(Value::is_string),
            Self::Paths(patterns) => patterns.iter().any(|p| p.matches(path)),
        }
    }
}

/// A JSON pointer whose `*` segments match any single segment.
///
/// `/group/*/fileIds` matches the `fileIds` array of every row of `group`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    segments: Vec<Option<String>>,
}

impl PathPattern {
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let pointer = JsonPointer::parse(s).map_err(|e| TypeError::InvalidPattern {
            pattern: s.to_string(),
            reason: e.to_string(),
        })?;
        let segments = pointer
            .segments()
            .iter()
            .map(|seg| (seg != WILDCARD).then(|| seg.clone()))
            .collect();
        Ok(Self { segments })
    }

    pub fn matches(&self, path: &JsonPointer) -> bool {
        self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path.segments())
                .all(|(want, seg)| want.as_ref().map_or(true, |w| w == seg))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = JsonPointer::from_segments(
            self.segments
                .iter()
                .map(|seg| seg.as_deref().unwrap_or(WILDCARD)),
        );
        write!(f, "{pointer}")
    }
}

impl std::str::FromStr for PathPattern {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PathPattern {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.to_string()
    }
}
