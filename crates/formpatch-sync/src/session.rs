//! The client save loop.

use serde_json::Value;
use tracing::{debug, info, warn};

use formpatch_diff::{Diagnostic, Differ};
use formpatch_patch::apply_patch_mut;

use crate::error::{SyncError, SyncResult};
use crate::transport::PatchTransport;
use crate::types::{PendingSave, SaveReport, SessionConfig, VersionedDocument};

/// A client's view of one document on a [`PatchTransport`].
///
/// `last_saved` is the latest state acknowledged by the server and the
/// baseline every outgoing patch is computed from. `current` is the live
/// document and may run ahead of it while a save is in flight.
pub struct SaveSession<T> {
    transport: T,
    differ: Differ,
    max_retries: u32,
    last_saved: VersionedDocument,
    current: Value,
    in_flight: bool,
    locked_by: Option<String>,
}

impl<T: PatchTransport> SaveSession<T> {
    /// Fetch the document and start a session on it.
    pub async fn open(transport: T, config: SessionConfig) -> SyncResult<Self> {
        let initial = transport.fetch().await?;
        debug!(version = initial.version, "session opened");
        Ok(Self {
            transport,
            differ: Differ::new(config.diff),
            max_retries: config.max_retries,
            current: initial.data.clone(),
            last_saved: initial,
            in_flight: false,
            locked_by: None,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn current(&self) -> &Value {
        &self.current
    }

    pub fn last_saved(&self) -> &VersionedDocument {
        &self.last_saved
    }

    /// Returns `true` if the live document differs from the last save.
    pub fn is_dirty(&self) -> bool {
        !formpatch_diff::values_equal(&self.current, &self.last_saved.data)
    }

    /// Edit the live document in place.
    pub fn update(&mut self, edit: impl FnOnce(&mut Value)) {
        edit(&mut self.current);
    }

    pub fn set_current(&mut self, doc: Value) {
        self.current = doc;
    }

    /// The owner currently holding the save lock.
    pub fn locked_by(&self) -> Option<&str> {
        self.locked_by.as_deref()
    }

    /// Flush unsaved changes, then block saving until `owner` unlocks.
    ///
    /// Used around server-side actions that need the stored document to
    /// stay put while they run.
    pub async fn lock(&mut self, owner: impl Into<String>) -> SyncResult<()> {
        let owner = owner.into();
        if let Some(holder) = &self.locked_by {
            warn!(%owner, %holder, "session already locked");
            return Err(SyncError::Locked {
                owner: holder.clone(),
            });
        }
        if self.is_dirty() {
            self.save().await?;
        }
        debug!(%owner, version = self.last_saved.version, "session locked");
        self.locked_by = Some(owner);
        Ok(())
    }

    /// Release the lock taken by `owner`.
    ///
    /// `result` is the document the server action left behind, if any. It
    /// is merged into `current` the same way a save response is.
    pub fn unlock(
        &mut self,
        owner: &str,
        result: Option<VersionedDocument>,
    ) -> SyncResult<Vec<Diagnostic>> {
        match &self.locked_by {
            None => {
                warn!(owner, "unlock requested on an unlocked session");
                return Err(SyncError::NotLocked);
            }
            Some(holder) if holder != owner => {
                warn!(owner, %holder, "unlock requested by another owner");
                return Err(SyncError::Locked {
                    owner: holder.clone(),
                });
            }
            Some(_) => {}
        }
        self.locked_by = None;
        debug!(owner, "session unlocked");
        match result {
            Some(doc) => self.merge(doc),
            None => Ok(Vec::new()),
        }
    }

    /// Compute the patch for the next save, or `None` if there is nothing to
    /// send. Until the returned save is finished or aborted, further calls
    /// fail with [`SyncError::SaveInProgress`]. A locked session fails with
    /// [`SyncError::Locked`].
    pub fn prepare_save(&mut self) -> SyncResult<Option<PendingSave>> {
        if self.in_flight {
            return Err(SyncError::SaveInProgress);
        }
        if let Some(owner) = &self.locked_by {
            return Err(SyncError::Locked {
                owner: owner.clone(),
            });
        }
        let outcome = self.differ.diff(&self.last_saved.data, &self.current)?;
        if outcome.patch.is_empty() {
            return Ok(None);
        }
        self.in_flight = true;
        Ok(Some(PendingSave {
            base_version: self.last_saved.version,
            patch: outcome.patch,
            diagnostics: outcome.diagnostics,
        }))
    }

    /// Merge the server's response into the live document.
    ///
    /// Changes the server made relative to `last_saved` are applied to
    /// `current` unless they conflict with edits made since; the response
    /// then becomes the new baseline.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        response: VersionedDocument,
    ) -> SyncResult<Vec<Diagnostic>> {
        self.in_flight = false;
        let diagnostics = self.merge(response)?;
        debug!(
            from = pending.base_version,
            to = self.last_saved.version,
            "save acknowledged"
        );
        Ok(diagnostics)
    }

    /// Give up on a prepared save without a response.
    pub fn abort_save(&mut self, pending: PendingSave) {
        debug!(base_version = pending.base_version, "save aborted");
        self.in_flight = false;
    }

    /// Save the live document, re-basing and retrying when the server's
    /// document moved underneath the patch.
    ///
    /// Returns `None` if there was nothing to save.
    pub async fn save(&mut self) -> SyncResult<Option<SaveReport>> {
        let mut attempts = 0;
        loop {
            let Some(pending) = self.prepare_save()? else {
                return Ok(None);
            };
            attempts += 1;

            match self.transport.patch(pending.base_version, &pending.patch).await {
                Ok(response) => {
                    let diagnostics = self.finish_save(pending, response)?;
                    info!(version = self.last_saved.version, attempts, "saved");
                    return Ok(Some(SaveReport {
                        version: self.last_saved.version,
                        attempts,
                        diagnostics,
                    }));
                }
                Err(SyncError::PreconditionFailed(reason)) => {
                    self.abort_save(pending);
                    if attempts > self.max_retries {
                        warn!(attempts, %reason, "giving up on save");
                        return Err(SyncError::RetriesExhausted { attempts });
                    }
                    warn!(attempts, %reason, "server document changed; re-basing");
                    let fresh = self.transport.fetch().await?;
                    self.merge(fresh)?;
                }
                Err(err) => {
                    self.abort_save(pending);
                    return Err(err);
                }
            }
        }
    }

    /// Three-way merge of `incoming` into `current`, then adopt it as the
    /// baseline.
    fn merge(&mut self, incoming: VersionedDocument) -> SyncResult<Vec<Diagnostic>> {
        let outcome = self
            .differ
            .diff_against(&self.last_saved.data, &incoming.data, &self.current)?;
        apply_patch_mut(&mut self.current, &outcome.patch)?;
        self.last_saved = incoming;
        Ok(outcome.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use crate::memory::InMemoryResource;
    use formpatch_diff::JsonPatch;

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn session(doc: Value) -> SaveSession<InMemoryResource> {
        SaveSession::open(InMemoryResource::new(doc), SessionConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn nothing_to_save() {
        let mut s = session(json!({"a": 1})).await;
        assert!(!s.is_dirty());
        assert_eq!(s.save().await.unwrap(), None);
    }

    #[tokio::test]
    async fn simple_add_round_trip() {
        let mut s = session(json!({})).await;
        s.update(|doc| doc["a"] = json!(1));

        let pending = s.prepare_save().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&pending.patch).unwrap(),
            json!([{"op": "add", "path": "/a", "value": 1}])
        );
        s.abort_save(pending);

        let report = s.save().await.unwrap().unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.version, 2);
        assert_eq!(s.current(), &json!({"a": 1}));
        assert_eq!(s.transport().snapshot().await.data, json!({"a": 1}));
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn only_one_save_at_a_time() {
        let mut s = session(json!({"a": 1})).await;
        s.set_current(json!({"a": 2}));
        let pending = s.prepare_save().unwrap().unwrap();
        assert!(matches!(s.prepare_save(), Err(SyncError::SaveInProgress)));
        s.abort_save(pending);
        assert!(s.prepare_save().unwrap().is_some());
    }

    #[tokio::test]
    async fn server_processing_is_merged_back() {
        let resource = InMemoryResource::new(json!({"a": 1})).with_processor(|doc| {
            let a = doc["a"].as_i64().unwrap_or_default();
            doc["double"] = json!(a * 2);
        });
        let mut s = SaveSession::open(resource, SessionConfig::default()).await.unwrap();
        s.update(|doc| doc["a"] = json!(3));
        s.save().await.unwrap();
        assert_eq!(s.current(), &json!({"a": 3, "double": 6}));
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn rows_added_while_saving_survive_late_prefill() {
        let (client, server) = (id(), id());
        let mut s = session(json!({"group": null, "a": 0})).await;

        s.update(|doc| doc["a"] = json!(1));
        let pending = s.prepare_save().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&pending.patch).unwrap(),
            json!([
                {"op": "test", "path": "/a", "value": 0},
                {"op": "replace", "path": "/a", "value": 1},
            ])
        );

        s.update(|doc| doc["group"] = json!([]));
        s.update(|doc| {
            if let Some(rows) = doc["group"].as_array_mut() {
                rows.push(json!({"altinnRowId": client, "rowFrom": "client"}));
            }
        });

        let response = VersionedDocument::new(
            2,
            json!({"group": [{"altinnRowId": server, "rowFrom": "server"}], "a": 1}),
        );
        s.finish_save(pending, response).unwrap();

        assert_eq!(
            s.current(),
            &json!({
                "group": [
                    {"altinnRowId": client, "rowFrom": "client"},
                    {"altinnRowId": server, "rowFrom": "server"},
                ],
                "a": 1,
            })
        );
    }

    #[tokio::test]
    async fn row_deleted_while_saving_is_not_restored() {
        let (row1, row2) = (id(), id());
        let mut s = session(json!({"group": [
            {"altinnRowId": row1, "a": 1},
            {"altinnRowId": row2, "a": 2},
        ]}))
        .await;

        s.update(|doc| doc["group"][1]["a"] = json!(3));
        let pending = s.prepare_save().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&pending.patch).unwrap(),
            json!([
                {"op": "test", "path": "/group/1/a", "value": 2},
                {"op": "replace", "path": "/group/1/a", "value": 3},
            ])
        );

        s.update(|doc| {
            if let Some(rows) = doc["group"].as_array_mut() {
                rows.remove(1);
            }
        });

        let response = VersionedDocument::new(
            2,
            json!({"group": [
                {"altinnRowId": row1, "a": 1},
                {"altinnRowId": row2, "a": 4},
            ]}),
        );
        s.finish_save(pending, response).unwrap();

        assert_eq!(s.current(), &json!({"group": [{"altinnRowId": row1, "a": 1}]}));
        let next = s.prepare_save().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&next.patch).unwrap(),
            json!([
                {"op": "test", "path": "/group", "value": [
                    {"altinnRowId": row1, "a": 1},
                    {"altinnRowId": row2, "a": 4},
                ]},
                {"op": "remove", "path": "/group/1"},
            ])
        );
    }

    #[tokio::test]
    async fn failed_precondition_rebases_and_retries() {
        let mut s = session(json!({"a": 1, "b": 1})).await;
        s.transport().replace(json!({"a": 5, "b": 2})).await;
        s.update(|doc| doc["a"] = json!(2));

        let report = s.save().await.unwrap().unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(s.current(), &json!({"a": 2, "b": 2}));
        assert_eq!(s.transport().snapshot().await.data, json!({"a": 2, "b": 2}));
    }

    struct AlwaysStale {
        doc: VersionedDocument,
    }

    #[async_trait]
    impl PatchTransport for AlwaysStale {
        async fn fetch(&self) -> SyncResult<VersionedDocument> {
            Ok(self.doc.clone())
        }

        async fn patch(&self, _: u64, _: &JsonPatch) -> SyncResult<VersionedDocument> {
            Err(SyncError::PreconditionFailed("stale".into()))
        }
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let transport = AlwaysStale {
            doc: VersionedDocument::new(1, json!({"a": 1})),
        };
        let config = SessionConfig {
            max_retries: 1,
            ..SessionConfig::default()
        };
        let mut s = SaveSession::open(transport, config).await.unwrap();
        s.set_current(json!({"a": 2}));
        let err = s.save().await.unwrap_err();
        assert!(matches!(err, SyncError::RetriesExhausted { attempts: 2 }));
        assert_eq!(s.current(), &json!({"a": 2}));
    }

    #[tokio::test]
    async fn transport_errors_release_the_pending_save() {
        struct Down;

        #[async_trait]
        impl PatchTransport for Down {
            async fn fetch(&self) -> SyncResult<VersionedDocument> {
                Ok(VersionedDocument::new(1, json!({})))
            }

            async fn patch(&self, _: u64, _: &JsonPatch) -> SyncResult<VersionedDocument> {
                Err(SyncError::Transport("connection refused".into()))
            }
        }

        let mut s = SaveSession::open(Down, SessionConfig::default()).await.unwrap();
        s.set_current(json!({"a": 1}));
        assert!(matches!(s.save().await, Err(SyncError::Transport(_))));
        assert!(s.prepare_save().unwrap().is_some());
    }

    #[tokio::test]
    async fn lock_flushes_then_blocks_saving() {
        let mut s = session(json!({"a": 1})).await;
        s.set_current(json!({"a": 2}));
        s.lock("action").await.unwrap();

        assert_eq!(s.locked_by(), Some("action"));
        assert_eq!(s.transport().snapshot().await.data, json!({"a": 2}));
        assert!(!s.is_dirty());

        s.set_current(json!({"a": 3}));
        assert!(matches!(s.prepare_save(), Err(SyncError::Locked { owner }) if owner == "action"));
        assert!(matches!(s.save().await, Err(SyncError::Locked { .. })));
        assert_eq!(s.transport().snapshot().await.data, json!({"a": 2}));
    }

    #[tokio::test]
    async fn lock_is_exclusive() {
        let mut s = session(json!({})).await;
        s.lock("first").await.unwrap();
        assert!(matches!(s.lock("second").await, Err(SyncError::Locked { owner }) if owner == "first"));
        assert!(matches!(
            s.unlock("second", None),
            Err(SyncError::Locked { owner }) if owner == "first"
        ));
        assert_eq!(s.locked_by(), Some("first"));

        assert!(s.unlock("first", None).unwrap().is_empty());
        assert_eq!(s.locked_by(), None);
        assert!(matches!(s.unlock("first", None), Err(SyncError::NotLocked)));
    }

    #[tokio::test]
    async fn unlock_merges_action_result() {
        let mut s = session(json!({"a": 1, "b": 1})).await;
        s.lock("action").await.unwrap();
        s.update(|doc| doc["a"] = json!(2));

        let result = VersionedDocument::new(2, json!({"a": 1, "b": 9, "c": true}));
        s.unlock("action", Some(result)).unwrap();

        assert_eq!(s.current(), &json!({"a": 2, "b": 9, "c": true}));
        assert_eq!(s.last_saved().version, 2);

        let pending = s.prepare_save().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&pending.patch).unwrap(),
            json!([
                {"op": "test", "path": "/a", "value": 1},
                {"op": "replace", "path": "/a", "value": 2},
            ])
        );
    }
}
