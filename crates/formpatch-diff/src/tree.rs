//! Tree diff: walk two (or three) documents and accumulate a patch.
//!
//! Objects recurse per key, arrays go through the sequence diff, and
//! everything else (including a change of kind) is a leaf handled by the
//! reconciliation policy in `reconcile.rs`.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use formpatch_types::{
    optional_values_equal, slices_equal, JsonPatch, JsonPointer, PatchOperation, ValueKind,
};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{DiffError, DiffResult, Snapshot};
use crate::identity::RowResolver;
use crate::options::DiffOptions;
use crate::sequence::diff_array;

/// The result of a diff: the patch and any diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiffOutcome {
    pub patch: JsonPatch,
    pub diagnostics: Vec<Diagnostic>,
}

impl DiffOutcome {
    /// Returns `true` if the patch has no operations.
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
    }
}

/// Entry point for computing patches with a fixed set of options.
#[derive(Clone, Debug, Default)]
pub struct Differ {
    options: DiffOptions,
}

impl Differ {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Two-way diff: the patch that turns `prev` into `next`, guarded by
    /// `test` operations.
    pub fn diff(&self, prev: &Value, next: &Value) -> DiffResult<DiffOutcome> {
        self.run(prev, next, None)
    }

    /// Three-way diff: a patch carrying `next`'s changes relative to `prev`,
    /// addressed to and safe against `current`.
    ///
    /// No `test` operations are emitted, since `current` already proves what
    /// the target holds.
    pub fn diff_against(
        &self,
        prev: &Value,
        next: &Value,
        current: &Value,
    ) -> DiffResult<DiffOutcome> {
        self.run(prev, next, Some(current))
    }

    fn run(&self, prev: &Value, next: &Value, current: Option<&Value>) -> DiffResult<DiffOutcome> {
        let prev_root = root_object(prev, Snapshot::Previous)?;
        let next_root = root_object(next, Snapshot::Next)?;
        let current_root = current
            .map(|c| root_object(c, Snapshot::Current))
            .transpose()?;

        let mut walker = Walker::new(&self.options, current.is_some());
        let mut path = JsonPointer::root();
        walker.diff_objects(prev_root, next_root, current_root, &mut path);

        let outcome = DiffOutcome {
            patch: walker.patch,
            diagnostics: walker.diagnostics.into_vec(),
        };
        debug!(
            ops = outcome.patch.len(),
            diagnostics = outcome.diagnostics.len(),
            three_way = current.is_some(),
            "patch computed"
        );
        Ok(outcome)
    }
}

/// Diff with default options; three-way when `current` is given.
pub fn create_patch(
    prev: &Value,
    next: &Value,
    current: Option<&Value>,
) -> DiffResult<DiffOutcome> {
    Differ::default().run(prev, next, current)
}

fn root_object(value: &Value, snapshot: Snapshot) -> DiffResult<&Map<String, Value>> {
    value.as_object().ok_or(DiffError::RootNotObject {
        snapshot,
        actual: ValueKind::of(value),
    })
}

/// Per-invocation state. Never shared between diffs.
pub(crate) struct Walker<'o> {
    pub(crate) options: &'o DiffOptions,
    pub(crate) resolver: RowResolver<'o>,
    pub(crate) has_current: bool,
    pub(crate) patch: JsonPatch,
    pub(crate) diagnostics: Diagnostics,
}

impl<'o> Walker<'o> {
    pub(crate) fn new(options: &'o DiffOptions, has_current: bool) -> Self {
        Self {
            options,
            resolver: RowResolver::new(&options.row_id_key),
            has_current,
            patch: JsonPatch::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Dispatch on the shapes of `prev` and `next`. `None` is a missing key.
    pub(crate) fn diff_value(
        &mut self,
        prev: Option<&Value>,
        next: Option<&Value>,
        current: Option<&Value>,
        path: &mut JsonPointer,
    ) {
        if optional_values_equal(prev, next) {
            return;
        }
        match (prev, next) {
            (Some(Value::Object(p)), Some(Value::Object(n))) => match current {
                None if !self.has_current => self.diff_objects(p, n, None, path),
                Some(Value::Object(c)) => self.diff_objects(p, n, Some(c), path),
                _ => self.compare_leaf(prev, next, current, path),
            },
            (Some(Value::Array(p)), Some(Value::Array(n))) => match current {
                None if !self.has_current => self.diff_arrays(p, n, None, path),
                Some(Value::Array(c)) if slices_equal(c, p) => {
                    self.diff_arrays(p, n, Some(c.as_slice()), path)
                }
                Some(Value::Array(c)) => self.reconcile_array(p, n, c, path),
                _ => self.compare_leaf(prev, next, current, path),
            },
            _ => self.compare_leaf(prev, next, current, path),
        }
    }

    /// Recurse over the union of keys: `prev`'s keys in order, then keys
    /// only `next` has.
    pub(crate) fn diff_objects(
        &mut self,
        prev: &Map<String, Value>,
        next: &Map<String, Value>,
        current: Option<&Map<String, Value>>,
        path: &mut JsonPointer,
    ) {
        let added = next.keys().filter(|key| !prev.contains_key(*key));
        for key in prev.keys().chain(added) {
            path.push(key.as_str());
            self.diff_value(
                prev.get(key),
                next.get(key),
                current.and_then(|c| c.get(key)),
                path,
            );
            path.pop();
        }
    }

    /// Arrays whose target has not diverged from `prev`.
    fn diff_arrays(
        &mut self,
        prev: &[Value],
        next: &[Value],
        current: Option<&[Value]>,
        path: &mut JsonPointer,
    ) {
        if self.options.leaf_arrays.is_leaf(path, next) {
            self.emit_test(path, || Value::Array(prev.to_vec()));
            self.patch
                .push(PatchOperation::replace(path.clone(), Value::Array(next.to_vec())));
            return;
        }

        let diff = diff_array(prev, next, &self.resolver, path, &mut self.diagnostics);
        if diff.is_structural() {
            self.emit_test(path, || Value::Array(prev.to_vec()));
            diff.emit(prev, next, path, &mut self.patch);
        }

        for &(i, j) in &diff.retained {
            path.push(j.to_string());
            self.diff_value(
                Some(&prev[i]),
                Some(&next[j]),
                current.and_then(|c| c.get(i)),
                path,
            );
            path.pop();
        }
    }

    /// Guard a mutation with a `test` of the baseline value, unless a
    /// current snapshot was supplied.
    pub(crate) fn emit_test(&mut self, path: &JsonPointer, baseline: impl FnOnce() -> Value) {
        if !self.has_current {
            self.patch.push(PatchOperation::test(path.clone(), baseline()));
        }
    }

    pub(crate) fn same_row(&mut self, a: &Value, b: &Value, path: &JsonPointer) -> bool {
        self.resolver.same_row(a, b, path, &mut self.diagnostics)
    }

    pub(crate) fn conflict_kept(&mut self, path: &JsonPointer) {
        self.diagnostics.record(path, DiagnosticKind::ConcurrentEditKept);
    }
}
