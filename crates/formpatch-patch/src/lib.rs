//! Patch application for formpatch.
//!
//! Applies RFC 6902 patches (restricted to `add`, `remove`, `replace` and
//! `test`) to JSON documents. Application is atomic: a patch either applies
//! in full or leaves the document untouched.

pub mod apply;
pub mod error;

pub use apply::{apply_operation, apply_patch, apply_patch_mut};
pub use error::{PatchError, PatchResult};
