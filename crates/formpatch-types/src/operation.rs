//! Patch operations and ordered patches.
//!
//! Operations serialize in the RFC 6902 wire shape:
//! `{"op": "add", "path": "/a/-", "value": 4}`. Order within a [`JsonPatch`]
//! is significant, since later operations address the array shapes produced
//! by earlier ones.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pointer::JsonPointer;

/// The kind of a patch operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Test,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Test => "test",
        })
    }
}

/// A single edit addressed by a JSON pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Insert a value; `-` as the last segment appends to an array.
    Add { path: JsonPointer, value: Value },
    /// Delete the value at `path`.
    Remove { path: JsonPointer },
    /// Overwrite an existing value.
    Replace { path: JsonPointer, value: Value },
    /// Assert that the value at `path` equals `value`.
    Test { path: JsonPointer, value: Value },
}

impl PatchOperation {
    pub fn add(path: JsonPointer, value: Value) -> Self {
        Self::Add { path, value }
    }

    pub fn remove(path: JsonPointer) -> Self {
        Self::Remove { path }
    }

    pub fn replace(path: JsonPointer, value: Value) -> Self {
        Self::Replace { path, value }
    }

    pub fn test(path: JsonPointer, value: Value) -> Self {
        Self::Test { path, value }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Self::Add { .. } => OpKind::Add,
            Self::Remove { .. } => OpKind::Remove,
            Self::Replace { .. } => OpKind::Replace,
            Self::Test { .. } => OpKind::Test,
        }
    }

    pub fn path(&self) -> &JsonPointer {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Test { path, .. } => path,
        }
    }

    /// The carried value; `None` for `remove`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Add { value, .. } | Self::Replace { value, .. } | Self::Test { value, .. } => {
                Some(value)
            }
            Self::Remove { .. } => None,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test { .. })
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.path())?;
        if let Some(value) = self.value() {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// An ordered list of patch operations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPatch {
    operations: Vec<PatchOperation>,
}

impl JsonPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn push(&mut self, op: PatchOperation) {
        self.operations.push(op);
    }

    /// Returns `true` if the patch has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOperation> {
        self.operations.iter()
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<PatchOperation> {
        self.operations
    }

    /// Number of operations of the given kind.
    pub fn count(&self, kind: OpKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    /// The same patch with every `test` operation dropped.
    pub fn without_tests(&self) -> JsonPatch {
        self.operations
            .iter()
            .filter(|op| !op.is_test())
            .cloned()
            .collect()
    }
}

impl From<Vec<PatchOperation>> for JsonPatch {
    fn from(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }
}

impl FromIterator<PatchOperation> for JsonPatch {
    fn from_iter<I: IntoIterator<Item = PatchOperation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for JsonPatch {
    type Item = PatchOperation;
    type IntoIter = std::vec::IntoIter<PatchOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl<'a> IntoIterator for &'a JsonPatch {
    type Item = &'a PatchOperation;
    type IntoIter = std::slice::Iter<'a, PatchOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ptr(s: &str) -> JsonPointer {
        JsonPointer::parse(s).unwrap()
    }

    #[test]
    fn serializes_in_wire_shape() {
        let patch: JsonPatch = vec![
            PatchOperation::test(ptr("/a"), json!(1)),
            PatchOperation::replace(ptr("/a"), json!(2)),
            PatchOperation::remove(ptr("/b/0")),
            PatchOperation::add(ptr("/c/-"), json!({"x": null})),
        ]
        .into();

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                {"op": "test", "path": "/a", "value": 1},
                {"op": "replace", "path": "/a", "value": 2},
                {"op": "remove", "path": "/b/0"},
                {"op": "add", "path": "/c/-", "value": {"x": null}},
            ])
        );
    }

    #[test]
    fn deserializes_from_wire_shape() {
        let patch: JsonPatch = serde_json::from_value(json!([
            {"op": "add", "path": "/a", "value": [1]},
            {"op": "remove", "path": "/b"},
        ]))
        .unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.operations()[0].kind(), OpKind::Add);
        assert_eq!(patch.operations()[1].path(), &ptr("/b"));
        assert!(patch.operations()[1].value().is_none());
    }

    #[test]
    fn unknown_op_is_rejected() {
        let res: Result<JsonPatch, _> =
            serde_json::from_value(json!([{"op": "move", "from": "/a", "path": "/b"}]));
        assert!(res.is_err());
    }

    #[test]
    fn without_tests_keeps_order() {
        let patch: JsonPatch = vec![
            PatchOperation::test(ptr("/a"), json!([1])),
            PatchOperation::remove(ptr("/a/0")),
            PatchOperation::test(ptr("/b"), json!(1)),
            PatchOperation::replace(ptr("/b"), json!(2)),
        ]
        .into();

        let stripped = patch.without_tests();
        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped.count(OpKind::Test), 0);
        assert_eq!(stripped.operations()[0], PatchOperation::remove(ptr("/a/0")));
        assert_eq!(patch.count(OpKind::Test), 2);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(
            PatchOperation::add(ptr("/a/-"), json!({"b": 1})).to_string(),
            r#"add /a/- {"b":1}"#
        );
        assert_eq!(PatchOperation::remove(ptr("/a/0")).to_string(), "remove /a/0");
    }
}
