use async_trait::async_trait;

use formpatch_diff::JsonPatch;

use crate::error::SyncResult;
use crate::types::VersionedDocument;

/// Server-side endpoint for a single form data document.
///
/// `patch` must apply atomically and report a failed `test` operation as
/// [`SyncError::PreconditionFailed`](crate::SyncError::PreconditionFailed).
/// The returned document is the server's state after applying the patch and
/// any processing of its own.
#[async_trait]
pub trait PatchTransport: Send + Sync {
    async fn fetch(&self) -> SyncResult<VersionedDocument>;
    async fn patch(&self, base_version: u64, patch: &JsonPatch) -> SyncResult<VersionedDocument>;
}
