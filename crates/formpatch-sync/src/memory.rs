//! In-memory document resource for tests and local tooling.
//!
//! [`InMemoryResource`] keeps a single [`VersionedDocument`] behind a tokio
//! `Mutex` and implements [`PatchTransport`] against it. An optional
//! [`Processor`] runs after every accepted patch, standing in for backend
//! data processing that rewrites the saved document.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use formpatch_diff::JsonPatch;
use formpatch_patch::apply_patch;

use crate::error::SyncResult;
use crate::transport::PatchTransport;
use crate::types::VersionedDocument;

/// Server-side rewrite applied to the document after each accepted patch.
pub type Processor = Box<dyn Fn(&mut Value) + Send + Sync>;

pub struct InMemoryResource {
    state: Mutex<VersionedDocument>,
    processor: Option<Processor>,
}

impl InMemoryResource {
    pub fn new(data: Value) -> Self {
        Self {
            state: Mutex::new(VersionedDocument::new(1, data)),
            processor: None,
        }
    }

    pub fn with_processor(mut self, processor: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        self.processor = Some(Box::new(processor));
        self
    }

    pub async fn snapshot(&self) -> VersionedDocument {
        self.state.lock().await.clone()
    }

    /// Overwrite the stored document, as another writer would.
    pub async fn replace(&self, data: Value) -> VersionedDocument {
        let mut state = self.state.lock().await;
        state.version += 1;
        state.data = data;
        state.clone()
    }
}

impl fmt::Debug for InMemoryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryResource")
            .field("processor", &self.processor.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PatchTransport for InMemoryResource {
    async fn fetch(&self) -> SyncResult<VersionedDocument> {
        Ok(self.snapshot().await)
    }

    async fn patch(&self, base_version: u64, patch: &JsonPatch) -> SyncResult<VersionedDocument> {
        let mut state = self.state.lock().await;
        if base_version != state.version {
            debug!(base_version, version = state.version, "patch computed against older version");
        }
        let mut data = apply_patch(&state.data, patch)?;
        if let Some(processor) = &self.processor {
            processor(&mut data);
        }
        state.version += 1;
        state.data = data;
        debug!(version = state.version, ops = patch.len(), "patch accepted");
        Ok(state.clone())
    }
}
