//! Row identity: are two array elements the same logical row?

use serde_json::Value;

use formpatch_types::{values_equal, JsonPointer};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Resolves row identity using the configured identifier property.
#[derive(Clone, Copy, Debug)]
pub struct RowResolver<'a> {
    row_id_key: &'a str,
}

impl<'a> RowResolver<'a> {
    pub fn new(row_id_key: &'a str) -> Self {
        Self { row_id_key }
    }

    pub fn row_id_key(&self) -> &'a str {
        self.row_id_key
    }

    /// The identifier of a row, if it is an object that carries one.
    pub fn row_id<'v>(&self, row: &'v Value) -> Option<&'v Value> {
        row.as_object()?.get(self.row_id_key)
    }

    /// Decide whether `a` and `b` represent the same row of the array at
    /// `path`.
    ///
    /// - Objects carrying the identifier match on it alone.
    /// - Objects both lacking it fall back to deep equality (recorded as a
    ///   diagnostic, since edited rows then look like replaced rows).
    /// - An object with the identifier never matches one without it.
    /// - Anything else matches on deep equality, so nested arrays and
    ///   scalars are compared by value and mixed kinds never match.
    pub fn same_row(
        &self,
        a: &Value,
        b: &Value,
        path: &JsonPointer,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                match (x.get(self.row_id_key), y.get(self.row_id_key)) {
                    (Some(id_a), Some(id_b)) => values_equal(id_a, id_b),
                    (None, None) => {
                        diagnostics.record(
                            path,
                            DiagnosticKind::MissingRowId {
                                key: self.row_id_key.to_string(),
                            },
                        );
                        values_equal(a, b)
                    }
                    _ => {
                        diagnostics.record(
                            path,
                            DiagnosticKind::PartialRowId {
                                key: self.row_id_key.to_string(),
                            },
                        );
                        false
                    }
                }
            }
            _ => values_equal(a, b),
        }
    }
}
