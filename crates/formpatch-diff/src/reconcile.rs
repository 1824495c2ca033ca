//! Three-way reconciliation: decisions made when the live document has
//! moved away from the baseline the client diffed from.
//!
//! The rule throughout is that concurrent edits win. A write is dropped
//! rather than clobbering a value the server changed, rows the server
//! deleted are never resurrected, and rows the server added are kept.

use serde_json::{Map, Value};

use formpatch_types::{optional_values_equal, JsonPointer, PatchOperation};

use crate::tree::Walker;

impl Walker<'_> {
    /// Leaf comparison. Also the fallback for any kind mismatch between
    /// the three snapshots.
    pub(crate) fn compare_leaf(
        &mut self,
        prev: Option<&Value>,
        next: Option<&Value>,
        current: Option<&Value>,
        path: &mut JsonPointer,
    ) {
        if optional_values_equal(prev, next) {
            return;
        }

        if self.has_current && !optional_values_equal(current, prev) {
            match (current, next) {
                (None, Some(n)) => {
                    self.patch.push(PatchOperation::add(path.clone(), n.clone()));
                }
                (c, n) if optional_values_equal(c, n) => {}
                (Some(Value::Array(c)), Some(Value::Array(n))) => self.append_missing(n, c, path),
                (Some(Value::Object(c)), Some(Value::Object(n))) => {
                    self.diff_objects(&Map::new(), n, Some(c), path)
                }
                _ => self.conflict_kept(path),
            }
            return;
        }

        match (prev, next) {
            (Some(p), None) => {
                self.emit_test(path, || p.clone());
                self.patch.push(PatchOperation::remove(path.clone()));
            }
            (None, Some(n)) => {
                self.patch.push(PatchOperation::add(path.clone(), n.clone()));
            }
            (Some(p), Some(n)) => {
                self.emit_test(path, || p.clone());
                self.patch.push(PatchOperation::replace(path.clone(), n.clone()));
            }
            (None, None) => {}
        }
    }

    /// Arrays where `current` differs from `prev`.
    ///
    /// Structural edits are replayed by identity against `current`:
    /// rows removed by `next` are removed where they now sit, rows added by
    /// `next` are appended, and rows present in all three are diffed at
    /// their index in `current`. Rows pair one to one, so repeated equal
    /// rows are counted rather than collapsed.
    pub(crate) fn reconcile_array(
        &mut self,
        prev: &[Value],
        next: &[Value],
        current: &[Value],
        path: &mut JsonPointer,
    ) {
        if self.options.leaf_arrays.is_leaf(path, next) {
            let mut claimed = vec![false; next.len()];
            let prev_in_next = self.pair_rows(prev, next, &mut claimed, path);
            if prev_in_next.iter().all(Option::is_some) {
                self.append_missing(next, current, path);
            } else {
                self.conflict_kept(path);
            }
            return;
        }

        let mut next_claimed = vec![false; next.len()];
        let prev_in_next = self.pair_rows(prev, next, &mut next_claimed, path);
        let mut live_claimed = vec![false; current.len()];
        let prev_in_current = self.pair_rows(prev, current, &mut live_claimed, path);

        let mut removed: Vec<usize> = prev_in_next
            .iter()
            .zip(&prev_in_current)
            .filter_map(|pair| match pair {
                (None, &Some(k)) => Some(k),
                _ => None,
            })
            .collect();
        removed.sort_unstable_by(|a, b| b.cmp(a));
        for &k in &removed {
            self.patch.push(PatchOperation::remove(path.index(k)));
        }

        let mut base_of_next = vec![None; next.len()];
        for (i, j) in prev_in_next.iter().enumerate() {
            if let Some(j) = *j {
                base_of_next[j] = Some(i);
            }
        }

        let mut kept = Vec::new();
        for (j, row) in next.iter().enumerate() {
            match base_of_next[j] {
                Some(i) => match prev_in_current[i] {
                    Some(k) => kept.push((k, j, Some(&prev[i]))),
                    // Deleted concurrently.
                    None => {}
                },
                None => {
                    let found = (0..current.len())
                        .find(|&k| !live_claimed[k] && self.same_row(&current[k], row, path));
                    match found {
                        Some(k) => {
                            live_claimed[k] = true;
                            kept.push((k, j, None));
                        }
                        None => {
                            self.patch.push(PatchOperation::add(path.append(), row.clone()));
                        }
                    }
                }
            }
        }

        for (k, j, base) in kept {
            let shifted = k - removed.iter().filter(|&&r| r < k).count();
            path.push(shifted.to_string());
            self.diff_value(base, Some(&next[j]), Some(&current[k]), path);
            path.pop();
        }
    }

    /// Append every element of `next` that `current` does not already hold,
    /// counting repeated elements.
    pub(crate) fn append_missing(
        &mut self,
        next: &[Value],
        current: &[Value],
        path: &mut JsonPointer,
    ) {
        let mut claimed = vec![false; current.len()];
        let next_in_current = self.pair_rows(next, current, &mut claimed, path);
        for (row, found) in next.iter().zip(next_in_current) {
            if found.is_none() {
                self.patch.push(PatchOperation::add(path.append(), row.clone()));
            }
        }
    }

    /// Pair each of `rows` with the first unclaimed element of `pool` that is
    /// the same row, claiming it.
    fn pair_rows(
        &mut self,
        rows: &[Value],
        pool: &[Value],
        claimed: &mut [bool],
        path: &JsonPointer,
    ) -> Vec<Option<usize>> {
        rows.iter()
            .map(|row| {
                let found = (0..pool.len())
                    .find(|&k| !claimed[k] && self.same_row(&pool[k], row, path));
                if let Some(k) = found {
                    claimed[k] = true;
                }
                found
            })
            .collect()
    }
}
