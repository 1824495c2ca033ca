//! Foundation types for formpatch.
//!
//! This crate provides the document model, addressing, and patch vocabulary
//! shared by every other formpatch crate.
//!
//! # Key Types
//!
//! - [`Document`] -- A JSON-like tree (object, array, or scalar)
//! - [`JsonPointer`] -- RFC 6901 location inside a document
//! - [`PatchOperation`] / [`JsonPatch`] -- Ordered `add`/`remove`/`replace`/`test` edits
//! - [`values_equal`] -- Deep structural equality over documents

pub mod document;
pub mod equality;
pub mod error;
pub mod operation;
pub mod pointer;

pub use document::{Document, ValueKind};
pub use equality::{optional_values_equal, slices_equal, values_equal};
pub use error::TypeError;
pub use operation::{JsonPatch, OpKind, PatchOperation};
pub use pointer::{JsonPointer, APPEND_SEGMENT};
