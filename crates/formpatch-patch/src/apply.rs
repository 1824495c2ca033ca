//! Operation application.

use serde_json::Value;
use tracing::debug;

use formpatch_types::{
    values_equal, JsonPatch, JsonPointer, PatchOperation, ValueKind, APPEND_SEGMENT,
};

use crate::error::{PatchError, PatchResult};

/// Apply `patch` to a copy of `doc` and return the result.
pub fn apply_patch(doc: &Value, patch: &JsonPatch) -> PatchResult<Value> {
    let mut out = doc.clone();
    for (index, op) in patch.iter().enumerate() {
        if let Err(err) = apply_operation(&mut out, op) {
            debug!(index, op = %op, error = %err, "patch rejected");
            return Err(err);
        }
    }
    debug!(ops = patch.len(), "patch applied");
    Ok(out)
}

/// Apply `patch` to `doc` in place. On error `doc` is left unchanged.
pub fn apply_patch_mut(doc: &mut Value, patch: &JsonPatch) -> PatchResult<()> {
    *doc = apply_patch(doc, patch)?;
    Ok(())
}

/// Apply a single operation. Not atomic on its own: use [`apply_patch`] for
/// all-or-nothing semantics across a patch.
pub fn apply_operation(doc: &mut Value, op: &PatchOperation) -> PatchResult<()> {
    match op {
        PatchOperation::Add { path, value } => add(doc, path, value.clone()),
        PatchOperation::Remove { path } => remove(doc, path).map(drop),
        PatchOperation::Replace { path, value } => replace(doc, path, value.clone()),
        PatchOperation::Test { path, value } => check(doc, path, value),
    }
}

fn add(doc: &mut Value, path: &JsonPointer, value: Value) -> PatchResult<()> {
    let Some((parent_path, last)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };
    match value_mut(doc, &parent_path)? {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == APPEND_SEGMENT {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(last, path)?;
            if index > items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.clone(),
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value);
            Ok(())
        }
        other => Err(PatchError::NotAContainer {
            path: parent_path,
            kind: ValueKind::of(other),
        }),
    }
}

fn remove(doc: &mut Value, path: &JsonPointer) -> PatchResult<Value> {
    let (parent_path, last) = path.split_last().ok_or(PatchError::RemoveRoot)?;
    match value_mut(doc, &parent_path)? {
        Value::Object(map) => map
            .remove(last)
            .ok_or_else(|| PatchError::PathNotFound { path: path.clone() }),
        Value::Array(items) => {
            let index = parse_index(last, path)?;
            if index >= items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.clone(),
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        }
        other => Err(PatchError::NotAContainer {
            path: parent_path,
            kind: ValueKind::of(other),
        }),
    }
}

fn replace(doc: &mut Value, path: &JsonPointer, value: Value) -> PatchResult<()> {
    *value_mut(doc, path)? = value;
    Ok(())
}

fn check(doc: &Value, path: &JsonPointer, expected: &Value) -> PatchResult<()> {
    let actual = lookup(doc, path);
    match actual {
        Some(found) if values_equal(found, expected) => Ok(()),
        _ => Err(PatchError::TestFailed {
            path: path.clone(),
            expected: expected.clone(),
            actual: actual.cloned(),
        }),
    }
}

/// Resolve an existing value, erroring on the first missing segment.
fn value_mut<'v>(doc: &'v mut Value, path: &JsonPointer) -> PatchResult<&'v mut Value> {
    let mut node = doc;
    for (depth, segment) in path.segments().iter().enumerate() {
        let here = || JsonPointer::from_segments(&path.segments()[..=depth]);
        node = match node {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| PatchError::PathNotFound { path: here() })?,
            Value::Array(items) => {
                let len = items.len();
                let index = parse_index(segment, &here())?;
                items.get_mut(index).ok_or_else(|| PatchError::IndexOutOfBounds {
                    path: here(),
                    index,
                    len,
                })?
            }
            other => {
                return Err(PatchError::NotAContainer {
                    path: JsonPointer::from_segments(&path.segments()[..depth]),
                    kind: ValueKind::of(other),
                })
            }
        };
    }
    Ok(node)
}

fn lookup<'v>(doc: &'v Value, path: &JsonPointer) -> Option<&'v Value> {
    path.segments().iter().try_fold(doc, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => strict_index(segment).and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Decimal, no sign, no leading zeros.
fn strict_index(segment: &str) -> Option<usize> {
    let digits = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
    if !digits || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    segment.parse().ok()
}

fn parse_index(segment: &str, path: &JsonPointer) -> PatchResult<usize> {
    strict_index(segment).ok_or_else(|| PatchError::InvalidIndex {
        path: path.clone(),
        segment: segment.to_string(),
    })
}
