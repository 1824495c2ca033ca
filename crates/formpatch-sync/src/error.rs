use thiserror::Error;

use formpatch_diff::DiffError;
use formpatch_patch::PatchError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The server rejected the patch because a `test` did not hold.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("a save is already in progress")]
    SaveInProgress,

    /// Saving is blocked until `owner` unlocks the session.
    #[error("saving is locked by {owner}")]
    Locked { owner: String },

    #[error("the session is not locked")]
    NotLocked,

    #[error("gave up after {attempts} attempts with failing preconditions")]
    RetriesExhausted { attempts: u32 },

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("patch error: {0}")]
    Patch(PatchError),
}

impl From<PatchError> for SyncError {
    fn from(err: PatchError) -> Self {
        if err.is_precondition_failure() {
            Self::PreconditionFailed(err.to_string())
        } else {
            Self::Patch(err)
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
