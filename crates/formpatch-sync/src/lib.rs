//! Save loop for formpatch.
//!
//! A [`SaveSession`] keeps the last document the server acknowledged and the
//! live document the user edits. Saving sends the guarded two-way patch
//! between them; the server's response is merged back three-way so edits
//! made while the request was in flight survive.

pub mod error;
pub mod memory;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use memory::{InMemoryResource, Processor};
pub use session::SaveSession;
pub use transport::PatchTransport;
pub use types::{PendingSave, SaveReport, SessionConfig, VersionedDocument};
