//! Draft lifecycle: edits, readiness, AI improvement and auto-save.
//!
//! Every change goes through the status state machine in
//! `listcast_core::draft_status`; a rejected change leaves the draft as it
//! was. Accepted edits are persisted in the background and never block the
//! caller.

use listcast_core::draft::{Draft, DraftKey, DraftPatch};
use listcast_core::draft_status::{DraftAction, DraftStatus};
use listcast_core::error::CoreError;
use listcast_core::services::ServiceError;
use listcast_core::validation::{check_channel_limits, LimitViolation};
use listcast_events::{event_types, WorkflowEvent};

use crate::error::WorkflowResult;
use crate::session::{PublishingSession, SessionState};
use crate::store::DraftRef;

/// An accepted edit together with the advisory channel-limit warnings for
/// the resulting post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftUpdate {
    pub draft: Draft,
    pub warnings: Vec<LimitViolation>,
}

impl PublishingSession {
    /// Apply `patch` to a draft atomically. The draft ends up `edited`.
    ///
    /// Drafts that are `publishing` or `published` are rejected with an
    /// invalid transition and left unchanged.
    pub async fn update_draft(
        &self,
        draft: impl Into<DraftRef>,
        patch: DraftPatch,
    ) -> WorkflowResult<DraftUpdate> {
        let draft = draft.into();
        let (updated, revision) = {
            let mut state = self.inner.state.write().await;
            let key = state.store.resolve(&draft)?;
            self.commit_patch(&mut state, &key, &patch)?
        };
        Ok(self.after_edit(updated, revision, patch, event_types::DRAFT_UPDATED))
    }

    /// Move a draft to `ready`. Returns `false` when it already was ready.
    pub async fn mark_ready(&self, draft: impl Into<DraftRef>) -> WorkflowResult<bool> {
        let draft = draft.into();
        let key = {
            let mut state = self.inner.state.write().await;
            let key = state.store.resolve(&draft)?;
            if state.store.get(&key).map(|d| d.status) == Some(DraftStatus::Ready) {
                return Ok(false);
            }
            let now = Self::now();
            state.store.update(&key, |d| d.mark_ready(now))?;
            key
        };

        tracing::info!(draft = %key, "Draft marked ready");
        self.emit(WorkflowEvent::new(event_types::DRAFT_READY).with_draft(key));
        Ok(true)
    }

    /// Mark every `generated` or `edited` draft ready. Returns the keys that
    /// changed.
    pub async fn mark_all_ready(&self) -> Vec<DraftKey> {
        let changed: Vec<DraftKey> = {
            let mut state = self.inner.state.write().await;
            let candidates: Vec<DraftKey> = state
                .store
                .iter()
                .filter(|d| matches!(d.status, DraftStatus::Generated | DraftStatus::Edited))
                .map(Draft::key)
                .collect();
            let now = Self::now();
            candidates
                .into_iter()
                .filter(|key| state.store.update(key, |d| d.mark_ready(now)).unwrap_or(false))
                .collect()
        };

        for key in &changed {
            self.emit(WorkflowEvent::new(event_types::DRAFT_READY).with_draft(key.clone()));
        }
        tracing::info!(drafts = changed.len(), "Drafts marked ready");
        changed
    }

    /// Ask the content service to rewrite one draft following
    /// `instruction`, and apply the result as an edit.
    ///
    /// Returns `None` when the draft changed while the service was working,
    /// in which case the rewrite is dropped rather than clobbering the newer
    /// edit.
    pub async fn improve_draft(
        &self,
        draft: impl Into<DraftRef>,
        instruction: &str,
    ) -> WorkflowResult<Option<DraftUpdate>> {
        if instruction.trim().is_empty() {
            return Err(CoreError::Validation("Improvement instruction must not be empty".to_string()).into());
        }

        let draft = draft.into();
        let (snapshot, revision) = {
            let state = self.inner.state.read().await;
            let key = state.store.resolve(&draft)?;
            let (Some(current), Some(revision)) = (state.store.get(&key), state.store.revision(&key)) else {
                return Err(CoreError::draft_not_found(&key).into());
            };
            if !current.status.is_editable() {
                return Err(CoreError::InvalidTransition {
                    from: current.status,
                    action: DraftAction::Edit,
                }
                .into());
            }
            (current.clone(), revision)
        };
        let key = snapshot.key();

        tracing::info!(draft = %key, "Requesting draft improvement");
        let content = match self.inner.services.generator.improve_content(&snapshot, instruction).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(draft = %key, error = %e, "Improvement failed");
                self.emit(
                    WorkflowEvent::new(event_types::DRAFT_IMPROVE_FAILED)
                        .with_property(snapshot.property_id.clone())
                        .with_draft(key)
                        .with_payload(serde_json::json!({
                            "error": e.to_string(),
                            "retryable": e.is_retryable(),
                        })),
                );
                return Err(e.into());
            }
        };

        let patch = DraftPatch::from_content(&content);
        let (updated, new_revision) = {
            let mut state = self.inner.state.write().await;
            if state.store.property_id() != Some(snapshot.property_id.as_str())
                || state.store.revision(&key) != Some(revision)
            {
                tracing::warn!(draft = %key, "Draft changed during improvement; result dropped");
                return Ok(None);
            }
            self.commit_patch(&mut state, &key, &patch)?
        };
        Ok(Some(self.after_edit(updated, new_revision, patch, event_types::DRAFT_IMPROVED)))
    }

    /// Wait for every in-flight auto-save to finish.
    pub async fn flush_autosaves(&self) {
        self.inner.autosaves.close();
        self.inner.autosaves.wait().await;
        self.inner.autosaves.reopen();
    }

    // ---- private helpers ----

    fn commit_patch(
        &self,
        state: &mut SessionState,
        key: &DraftKey,
        patch: &DraftPatch,
    ) -> Result<(Draft, u64), CoreError> {
        let editor = self.inner.config.agent_id.as_deref();
        let now = Self::now();
        let updated = state.store.update(key, |d| {
            d.apply_patch(patch, editor, now)?;
            Ok(d.clone())
        })?;
        let revision = state
            .store
            .revision(key)
            .ok_or_else(|| CoreError::draft_not_found(key))?;
        Ok((updated, revision))
    }

    fn after_edit(&self, draft: Draft, revision: u64, patch: DraftPatch, event_type: &str) -> DraftUpdate {
        let key = draft.key();
        let warnings = check_channel_limits(&draft);
        let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        if !warnings.is_empty() {
            tracing::debug!(draft = %key, warnings = ?messages, "Draft exceeds channel limits");
        }
        self.emit(
            WorkflowEvent::new(event_type)
                .with_property(draft.property_id.clone())
                .with_draft(key)
                .with_payload(serde_json::json!({ "warnings": messages })),
        );

        self.spawn_autosave(&draft, revision, patch);
        DraftUpdate { draft, warnings }
    }

    /// Persist an edit in the background. The response only lands if the
    /// draft is still at `revision`; anything newer wins.
    fn spawn_autosave(&self, draft: &Draft, revision: u64, patch: DraftPatch) {
        let Some(draft_id) = draft.id.clone() else {
            tracing::debug!(draft = %draft.key(), "Draft not persisted yet; auto-save skipped");
            return;
        };
        let session = self.clone();
        let key = draft.key();
        let property_id = draft.property_id.clone();

        self.inner.autosaves.spawn(async move {
            let result = session
                .inner
                .services
                .repository
                .update_draft(&draft_id, &patch)
                .await;
            session.finish_autosave(&property_id, key, revision, result).await;
        });
    }

    async fn finish_autosave(
        &self,
        property_id: &str,
        key: DraftKey,
        revision: u64,
        result: Result<Draft, ServiceError>,
    ) {
        let mut state = self.inner.state.write().await;
        let current = state.store.property_id() == Some(property_id)
            && state.store.revision(&key) == Some(revision);

        match result {
            Ok(saved) if current => {
                state.store.annotate(&key, |d| {
                    if d.id.is_none() {
                        d.id = saved.id;
                    }
                    d.updated_at = saved.updated_at;
                });
                tracing::debug!(draft = %key, revision, "Draft auto-saved");
            }
            Ok(_) => {
                tracing::debug!(draft = %key, revision, "Stale auto-save response ignored");
            }
            Err(e) if current => {
                drop(state);
                tracing::warn!(draft = %key, error = %e, "Auto-save failed");
                self.emit(
                    WorkflowEvent::new(event_types::AUTOSAVE_FAILED)
                        .with_property(property_id.to_string())
                        .with_draft(key)
                        .with_payload(serde_json::json!({
                            "error": e.to_string(),
                            "retryable": e.is_retryable(),
                        })),
                );
            }
            Err(e) => {
                tracing::debug!(draft = %key, error = %e, "Superseded auto-save failed");
            }
        }
    }
}
