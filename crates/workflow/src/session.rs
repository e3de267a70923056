//! The publishing session: one agent working on one property at a time.
//!
//! [`PublishingSession`] owns the draft store, the selection state and the
//! fences, and hands them to the coordinator, lifecycle and orchestrator
//! operations (implemented in their own modules). The state lock is never
//! held across a call to an external service.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use listcast_core::channel::Channel;
use listcast_core::draft::{Draft, DraftKey};
use listcast_core::draft_status::DraftStatus;
use listcast_core::error::CoreError;
use listcast_core::generation::{ContentLength, Tone};
use listcast_core::language::Language;
use listcast_core::services::{ContentGenerator, DraftRepository, Publisher};
use listcast_core::types::{DraftId, PropertyId};
use listcast_events::{event_types, EventBus, WorkflowEvent};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;

use crate::config::WorkflowConfig;
use crate::coordinator::GenerationOutcome;
use crate::error::{WorkflowError, WorkflowResult};
use crate::fence::GenerationFence;
use crate::selection::{GenerationSettings, Selection};
use crate::store::{DraftRef, DraftStore, StatusSummary};

/// The external collaborators a session talks to.
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn ContentGenerator>,
    pub repository: Arc<dyn DraftRepository>,
    pub publisher: Arc<dyn Publisher>,
}

impl Services {
    /// Use one backend for all three roles.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: ContentGenerator + DraftRepository + Publisher + 'static,
    {
        Self {
            generator: backend.clone(),
            repository: backend.clone(),
            publisher: backend,
        }
    }
}

/// Drafts submitted under one publish job, by server id.
#[derive(Debug, Clone, Default)]
pub(crate) struct TrackedJob {
    pub(crate) drafts: HashMap<DraftId, DraftKey>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) selection: Selection,
    pub(crate) store: DraftStore,
    pub(crate) fence: GenerationFence,
    pub(crate) jobs: HashMap<String, TrackedJob>,
}

impl SessionState {
    pub(crate) fn require_property(&self) -> WorkflowResult<PropertyId> {
        self.selection
            .property_id()
            .map(str::to_string)
            .ok_or(WorkflowError::NoPropertySelected)
    }
}

pub(crate) struct Inner {
    pub(crate) state: RwLock<SessionState>,
    pub(crate) services: Services,
    pub(crate) events: Arc<EventBus>,
    pub(crate) config: WorkflowConfig,
    pub(crate) autosaves: TaskTracker,
}

/// Outcome of loading a property's persisted drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { drafts: usize },
    /// Another property was selected while the load was in flight.
    Discarded,
}

/// Cheaply cloneable handle; clones share the same session.
#[derive(Clone)]
pub struct PublishingSession {
    pub(crate) inner: Arc<Inner>,
}

impl PublishingSession {
    pub fn new(services: Services, events: Arc<EventBus>, config: WorkflowConfig) -> Self {
        let settings = GenerationSettings {
            tone: config.default_tone,
            length: config.default_length,
        };
        let state = SessionState {
            selection: Selection::new(settings),
            ..SessionState::default()
        };
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                services,
                events,
                config,
                autosaves: TaskTracker::new(),
            }),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }

    pub(crate) fn emit(&self, event: WorkflowEvent) {
        self.inner.events.publish(event);
    }

    // ---- property selection ----

    /// Select a property and load its persisted drafts.
    ///
    /// Everything belonging to the previous property is dropped and any
    /// generation still in flight for it will be discarded on arrival. The
    /// selected languages and channels are derived from the loaded drafts.
    pub async fn select_property(&self, property_id: impl Into<PropertyId>) -> WorkflowResult<LoadOutcome> {
        let property_id: PropertyId = property_id.into();
        if property_id.trim().is_empty() {
            return Err(CoreError::Validation("Property id must not be empty".to_string()).into());
        }

        let epoch = {
            let mut state = self.inner.state.write().await;
            let epoch = state.fence.advance_epoch();
            state.selection.select(property_id.clone());
            state.store.reset(Some(property_id.clone()));
            state.jobs.clear();
            epoch
        };
        tracing::info!(property_id = %property_id, epoch, "Property selected");

        let loaded = self.inner.services.repository.get_drafts(&property_id).await;

        let mut state = self.inner.state.write().await;
        if state.fence.epoch() != epoch {
            tracing::warn!(property_id = %property_id, "Discarding drafts of a deselected property");
            return Ok(LoadOutcome::Discarded);
        }

        let mut drafts = match loaded {
            Ok(drafts) => drafts,
            Err(e) => {
                drop(state);
                tracing::error!(property_id = %property_id, error = %e, "Failed to load drafts");
                self.emit(
                    WorkflowEvent::new(event_types::PROPERTY_LOAD_FAILED)
                        .with_property(property_id.clone())
                        .with_payload(serde_json::json!({
                            "error": e.to_string(),
                            "retryable": e.is_retryable(),
                        })),
                );
                return Err(e.into());
            }
        };

        drafts.retain(|draft| draft.property_id == property_id);
        // Oldest first so the latest copy of a duplicated key wins.
        drafts.sort_by_key(|draft| draft.updated_at);

        // Drafts generated since the selection are newer than anything
        // persisted before it.
        let fresh: HashSet<DraftKey> = state.store.iter().map(Draft::key).collect();
        for draft in drafts {
            if !fresh.contains(&draft.key()) {
                state.store.insert(draft)?;
            }
        }
        let SessionState { selection, store, .. } = &mut *state;
        selection.derive_from(store.iter());
        let count = store.len();
        drop(state);

        tracing::info!(property_id = %property_id, drafts = count, "Drafts loaded");
        self.emit(
            WorkflowEvent::new(event_types::PROPERTY_LOADED)
                .with_property(property_id)
                .with_payload(serde_json::json!({ "drafts": count })),
        );
        Ok(LoadOutcome::Loaded { drafts: count })
    }

    /// Drop the selected property and everything derived from it.
    pub async fn clear_property(&self) {
        let mut state = self.inner.state.write().await;
        state.fence.advance_epoch();
        state.selection.clear();
        state.store.reset(None);
        state.jobs.clear();
        tracing::info!("Property cleared");
    }

    // ---- language and channel selection ----

    /// Select a language. A newly added language is generated right away
    /// for the selected channels; returns `None` when nothing was generated.
    pub async fn add_language(&self, language: Language) -> WorkflowResult<Option<GenerationOutcome>> {
        let (property_id, channels, settings) = {
            let mut state = self.inner.state.write().await;
            let property_id = state.require_property()?;
            if !state.selection.add_language(language.clone()) {
                return Ok(None);
            }
            (
                property_id,
                state.selection.channels().to_vec(),
                state.selection.settings,
            )
        };

        if channels.is_empty() {
            tracing::debug!(language = %language, "No channels selected; generation deferred");
            return Ok(None);
        }

        let outcome = self
            .request_generation(
                &property_id,
                language,
                channels,
                settings.tone,
                settings.length,
                self.inner.config.agent_id.clone(),
            )
            .await?;
        Ok(Some(outcome))
    }

    /// Deselect a language. Its drafts stay in the store and remain
    /// publishable.
    pub async fn remove_language(&self, language: &Language) -> bool {
        self.inner.state.write().await.selection.remove_language(language)
    }

    pub async fn add_channel(&self, channel: Channel) -> bool {
        self.inner.state.write().await.selection.add_channel(channel)
    }

    pub async fn remove_channel(&self, channel: Channel) -> bool {
        self.inner.state.write().await.selection.remove_channel(channel)
    }

    pub async fn set_channels(&self, channels: impl IntoIterator<Item = Channel>) {
        self.inner.state.write().await.selection.set_channels(channels);
    }

    pub async fn set_current(&self, key: DraftKey) {
        self.inner
            .state
            .write()
            .await
            .selection
            .set_current(key.language, key.channel);
    }

    pub async fn set_generation_settings(&self, tone: Tone, length: ContentLength) {
        self.inner.state.write().await.selection.settings = GenerationSettings { tone, length };
    }

    // ---- read accessors ----

    pub async fn property_id(&self) -> Option<PropertyId> {
        self.inner.state.read().await.selection.property_id().map(str::to_string)
    }

    pub async fn selected_languages(&self) -> Vec<Language> {
        self.inner.state.read().await.selection.languages().to_vec()
    }

    pub async fn selected_channels(&self) -> Vec<Channel> {
        self.inner.state.read().await.selection.channels().to_vec()
    }

    pub async fn generation_settings(&self) -> GenerationSettings {
        self.inner.state.read().await.selection.settings
    }

    pub async fn current(&self) -> Option<DraftKey> {
        self.inner.state.read().await.selection.current()
    }

    pub async fn current_draft(&self) -> Option<Draft> {
        let state = self.inner.state.read().await;
        state.selection.current().and_then(|key| state.store.get(&key).cloned())
    }

    pub async fn draft(&self, draft: impl Into<DraftRef>) -> Option<Draft> {
        let state = self.inner.state.read().await;
        let key = state.store.resolve(&draft.into()).ok()?;
        state.store.get(&key).cloned()
    }

    pub async fn drafts(&self) -> Vec<Draft> {
        self.inner.state.read().await.store.iter().cloned().collect()
    }

    /// language -> channel -> draft.
    pub async fn drafts_by_language(&self) -> BTreeMap<Language, BTreeMap<Channel, Draft>> {
        self.inner.state.read().await.store.by_language()
    }

    pub async fn ready_drafts(&self) -> Vec<Draft> {
        self.inner
            .state
            .read()
            .await
            .store
            .iter()
            .filter(|draft| draft.status == DraftStatus::Ready)
            .cloned()
            .collect()
    }

    pub async fn summary(&self) -> StatusSummary {
        self.inner.state.read().await.store.summary()
    }

    pub async fn is_loading(&self, language: &Language) -> bool {
        self.inner.state.read().await.selection.is_loading(language)
    }

    pub async fn loading_states(&self) -> BTreeMap<Language, bool> {
        self.inner.state.read().await.selection.loading_states().clone()
    }

    /// Publish jobs that still have drafts awaiting a result.
    pub async fn pending_jobs(&self) -> Vec<String> {
        let state = self.inner.state.read().await;
        let mut jobs: Vec<String> = state.jobs.keys().cloned().collect();
        jobs.sort();
        jobs
    }

    pub(crate) fn now() -> listcast_core::types::Timestamp {
        Utc::now()
    }
}
