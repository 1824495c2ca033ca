//! Diff engine for formpatch.
//!
//! Computes the ordered JSON patch that turns one form data document into
//! another, optionally reconciled against a third, fresher snapshot so that
//! concurrent edits already applied there are not clobbered.
//!
//! # Key Types
//!
//! - [`Differ`] / [`create_patch`] -- Entry points (two-way and three-way)
//! - [`DiffOutcome`] -- The patch plus the [`Diagnostic`]s gathered on the way
//! - [`DiffOptions`] / [`LeafArrayPolicy`] -- Row identifier key and opaque-array rules
//! - [`RowResolver`] -- Decides whether two array elements are the same row
//! - [`ArrayDiff`] -- LCS alignment of two arrays

pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod options;
mod reconcile;
pub mod sequence;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{DiffError, DiffResult, Snapshot};
pub use identity::RowResolver;
pub use options::{DiffOptions, LeafArrayPolicy, PathPattern, DEFAULT_ROW_ID_KEY};
pub use sequence::{diff_array, ArrayDiff};
pub use tree::{create_patch, DiffOutcome, Differ};

pub use formpatch_types::{values_equal, JsonPatch, JsonPointer, PatchOperation};
