//! Sequence diff: align two arrays by row identity.
//!
//! The alignment is a longest common subsequence under
//! [`RowResolver::same_row`], computed with `similar`'s LCS algorithm. Elements of `prev` outside the subsequence are
//! removed and elements of `next` outside it are inserted. Rows inside it are
//! retained in place and diffed field by field by the caller.

use std::convert::Infallible;

use serde_json::Value;
use similar::algorithms::{lcs, DiffHook};

use formpatch_types::{JsonPatch, JsonPointer, PatchOperation};

use crate::diagnostics::Diagnostics;
use crate::identity::RowResolver;

/// Row-level differences between two arrays.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayDiff {
    /// Indices into `prev`, in descending order.
    pub removals: Vec<usize>,
    /// Indices into `next`, in ascending order.
    pub insertions: Vec<usize>,
    /// `(prev index, next index)` pairs of rows kept by identity.
    pub retained: Vec<(usize, usize)>,
}

impl ArrayDiff {
    /// Returns `true` if rows were removed or inserted.
    pub fn is_structural(&self) -> bool {
        !self.removals.is_empty() || !self.insertions.is_empty()
    }

    /// Emit the structural operations against a working copy of `prev`.
    ///
    /// Removals run back to front so no removal shifts a pending one.
    /// Insertions then run front to back; an insertion at the working
    /// copy's current length is written as an append (`-`).
    pub fn emit(&self, prev: &[Value], next: &[Value], path: &JsonPointer, patch: &mut JsonPatch) {
        let mut working: Vec<&Value> = prev.iter().collect();

        for &i in &self.removals {
            patch.push(PatchOperation::remove(path.index(i)));
            working.remove(i);
        }

        for &j in &self.insertions {
            let target = if j >= working.len() {
                working.push(&next[j]);
                path.append()
            } else {
                working.insert(j, &next[j]);
                path.index(j)
            };
            patch.push(PatchOperation::add(target, next[j].clone()));
        }

        debug_assert_eq!(working.len(), next.len());
    }
}

/// Align `prev` with `next` and classify every element.
pub fn diff_array(
    prev: &[Value],
    next: &[Value],
    resolver: &RowResolver<'_>,
    path: &JsonPointer,
    diagnostics: &mut Diagnostics,
) -> ArrayDiff {
    let matches = MatchTable::build(prev.len(), next.len(), |i, j| {
        resolver.same_row(&prev[i], &next[j], path, diagnostics)
    });
    let retained = matches.align();

    let mut kept_prev = vec![false; prev.len()];
    let mut kept_next = vec![false; next.len()];
    for &(i, j) in &retained {
        kept_prev[i] = true;
        kept_next[j] = true;
    }

    ArrayDiff {
        removals: (0..prev.len()).rev().filter(|&i| !kept_prev[i]).collect(),
        insertions: (0..next.len()).filter(|&j| !kept_next[j]).collect(),
        retained,
    }
}

/// Identity decisions for every `(prev, next)` pair, computed once so the
/// resolver's diagnostics are recorded outside the diff algorithm.
struct MatchTable {
    prev: Vec<PrevRow>,
    cells: Vec<bool>,
    width: usize,
}

/// Position in `prev`.
struct PrevRow(usize);

/// Position in `next`, compared against `prev` through the table.
struct NextRow<'t> {
    index: usize,
    table: &'t MatchTable,
}

impl PartialEq<PrevRow> for NextRow<'_> {
    fn eq(&self, other: &PrevRow) -> bool {
        self.table.cells[other.0 * self.table.width + self.index]
    }
}

impl MatchTable {
    fn build(n: usize, m: usize, mut same: impl FnMut(usize, usize) -> bool) -> Self {
        let mut cells = Vec::with_capacity(n * m);
        for i in 0..n {
            for j in 0..m {
                cells.push(same(i, j));
            }
        }
        Self {
            prev: (0..n).map(PrevRow).collect(),
            cells,
            width: m,
        }
    }

    /// Longest common subsequence as ascending `(i, j)` pairs. When skipping
    /// either side keeps the same length, the `prev` side is skipped first.
    fn align(&self) -> Vec<(usize, usize)> {
        let next: Vec<NextRow<'_>> = (0..self.width)
            .map(|index| NextRow { index, table: self })
            .collect();
        let mut hook = Retained::default();
        let outcome = lcs::diff(&mut hook, &self.prev, 0..self.prev.len(), &next, 0..next.len());
        if let Err(never) = outcome {
            match never {}
        }
        hook.pairs
    }
}

/// Collects the equal runs reported by the diff.
#[derive(Default)]
struct Retained {
    pairs: Vec<(usize, usize)>,
}

impl DiffHook for Retained {
    type Error = Infallible;

    fn equal(&mut self, old_index: usize, new_index: usize, len: usize) -> Result<(), Infallible> {
        self.pairs
            .extend((0..len).map(|offset| (old_index + offset, new_index + offset)));
        Ok(())
    }

    fn delete(&mut self, _old: usize, _len: usize, _new: usize) -> Result<(), Infallible> {
        Ok(())
    }

    fn insert(&mut self, _old: usize, _new: usize, _len: usize) -> Result<(), Infallible> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(prev: Value, next: Value) -> (ArrayDiff, JsonPatch) {
        let prev = prev.as_array().unwrap().clone();
        let next = next.as_array().unwrap().clone();
        let resolver = RowResolver::new("id");
        let path = JsonPointer::from_segments(["a"]);
        let mut diags = Diagnostics::new();
        let diff = diff_array(&prev, &next, &resolver, &path, &mut diags);
        let mut patch = JsonPatch::new();
        diff.emit(&prev, &next, &path, &mut patch);
        (diff, patch)
    }

    fn paths(patch: &JsonPatch) -> Vec<String> {
        patch.iter().map(|op| format!("{} {}", op.kind(), op.path())).collect()
    }

    #[test]
    fn alignment_basic() {
        let a = [1, 2, 3, 4];
        let b = [2, 4, 5];
        let table = MatchTable::build(4, 3, |i, j| a[i] == b[j]);
        assert_eq!(table.align(), vec![(1, 0), (3, 1)]);
        assert!(MatchTable::build(0, 3, |_, _| true).align().is_empty());
        assert!(MatchTable::build(3, 0, |_, _| true).align().is_empty());
    }

    #[test]
    fn identity_predicate_drives_alignment() {
        let (diff, _) = run(
            json!([{"id": 1}, {"id": 2}, {"id": 3}]),
            json!([{"id": 3}, {"id": 1, "v": 9}, {"id": 2}]),
        );
        assert_eq!(diff.retained, vec![(0, 1), (1, 2)]);
        assert_eq!(diff.removals, vec![2]);
        assert_eq!(diff.insertions, vec![0]);
    }

    #[test]
    fn identical_arrays_are_not_structural() {
        let (diff, patch) = run(json!([1, 2, 3]), json!([1, 2, 3]));
        assert!(!diff.is_structural());
        assert_eq!(diff.retained, vec![(0, 0), (1, 1), (2, 2)]);
        assert!(patch.is_empty());
    }

    #[test]
    fn append_uses_dash() {
        let (_, patch) = run(json!([1, 2, 3]), json!([1, 2, 3, 4]));
        assert_eq!(paths(&patch), ["add /a/-"]);
    }

    #[test]
    fn removals_run_back_to_front() {
        let (diff, patch) = run(json!([0, 1, 2, 3, 4, 5, 6]), json!([0, 1, 5, 6]));
        assert_eq!(diff.removals, vec![4, 3, 2]);
        assert_eq!(paths(&patch), ["remove /a/4", "remove /a/3", "remove /a/2"]);
    }

    #[test]
    fn remove_front_then_append() {
        let (_, patch) = run(json!([1, 2, 3]), json!([2, 3, 4]));
        assert_eq!(paths(&patch), ["remove /a/0", "add /a/-"]);
    }

    #[test]
    fn replaced_middle_element_is_remove_then_insert() {
        let (_, patch) = run(json!(["foo", "bar", "baz"]), json!(["foo", "bar2", "baz"]));
        assert_eq!(paths(&patch), ["remove /a/1", "add /a/1"]);
    }

    #[test]
    fn reorder_moves_minimal_rows() {
        let (diff, patch) = run(
            json!([{"id": 1}, {"id": 2}, {"id": 3}]),
            json!([{"id": 3}, {"id": 1}, {"id": 2}]),
        );
        assert_eq!(diff.retained, vec![(0, 1), (1, 2)]);
        assert_eq!(paths(&patch), ["remove /a/2", "add /a/0"]);
        assert_eq!(patch.operations()[1].value(), Some(&json!({"id": 3})));
    }

    #[test]
    fn clearing_an_array_removes_every_row() {
        let (_, patch) = run(json!([{"id": 1}, {"id": 2}, {"id": 3}]), json!([]));
        assert_eq!(paths(&patch), ["remove /a/2", "remove /a/1", "remove /a/0"]);
    }

    #[test]
    fn filling_an_empty_array_appends() {
        let (_, patch) = run(json!([]), json!(["x", "y"]));
        assert_eq!(paths(&patch), ["add /a/-", "add /a/-"]);
    }

    #[test]
    fn retained_rows_may_differ_in_value() {
        let (diff, patch) = run(
            json!([{"id": 1, "v": 1}, {"id": 2, "v": 2}]),
            json!([{"id": 1, "v": 9}, {"id": 2, "v": 2}]),
        );
        assert!(!diff.is_structural());
        assert_eq!(diff.retained, vec![(0, 0), (1, 1)]);
        assert!(patch.is_empty());
    }
}
