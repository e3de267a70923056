//! Generation coordinator: one content request per language, fanned out
//! across the selected channels, merged into the store as a full replace.

use listcast_core::channel::Channel;
use listcast_core::draft::{Draft, DraftKey};
use listcast_core::draft_status::DraftStatus;
use listcast_core::error::CoreError;
use listcast_core::generation::{ContentLength, GenerationRequest, Tone};
use listcast_core::language::Language;
use listcast_core::types::AgentId;
use listcast_events::{event_types, WorkflowEvent};

use crate::error::{WorkflowError, WorkflowResult};
use crate::fence::{Ticket, Verdict};
use crate::session::{PublishingSession, SessionState};

/// What became of a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The response replaced the language's drafts.
    Applied(Vec<Draft>),
    /// A newer request for the language, or another property, superseded
    /// it. The store was not touched.
    Discarded,
}

impl GenerationOutcome {
    pub fn drafts(&self) -> &[Draft] {
        match self {
            Self::Applied(drafts) => drafts,
            Self::Discarded => &[],
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded)
    }
}

/// Clears the loading flag of a request whose future is dropped before the
/// response is handled, as long as no newer request owns the flag.
struct PendingGeneration {
    session: PublishingSession,
    language: Language,
    ticket: Ticket,
    armed: bool,
}

impl PendingGeneration {
    fn settle(state: &mut SessionState, language: &Language, ticket: Ticket) {
        if state.fence.check(language, ticket) == Verdict::Current {
            state.selection.set_loading(language, false);
        }
    }
}

impl Drop for PendingGeneration {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(language = %self.language, version = self.ticket.version, "Generation request abandoned");

        let (language, ticket) = (self.language.clone(), self.ticket);
        if let Ok(mut state) = self.session.inner.state.try_write() {
            Self::settle(&mut state, &language, ticket);
            return;
        }
        // Lock busy: settle once it frees up.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let session = self.session.clone();
            handle.spawn(async move {
                let mut state = session.inner.state.write().await;
                Self::settle(&mut state, &language, ticket);
            });
        }
    }
}

impl PublishingSession {
    /// Generate drafts for every channel of one language.
    ///
    /// On success the language's drafts are replaced by one `generated`
    /// draft per returned channel. On failure prior drafts stay untouched.
    /// The loading flag is cleared when the latest request for the
    /// language completes, whatever its result, or when its future is
    /// dropped before completing.
    pub async fn request_generation(
        &self,
        property_id: &str,
        language: Language,
        channels: Vec<Channel>,
        tone: Tone,
        length: ContentLength,
        agent_id: Option<AgentId>,
    ) -> WorkflowResult<GenerationOutcome> {
        let request = GenerationRequest::new(property_id, language, channels, tone, length, agent_id)?;
        let language = request.language.clone();

        let ticket = {
            let mut state = self.inner.state.write().await;
            let selected = state.require_property()?;
            if selected != request.property_id {
                return Err(CoreError::Validation(format!(
                    "Property {} is not the selected property",
                    request.property_id
                ))
                .into());
            }
            if let Some(busy) = state.store.for_language(&language).find(|draft| {
                draft.status == DraftStatus::Publishing && request.channels.contains(&draft.channel)
            }) {
                return Err(CoreError::Conflict(format!(
                    "Draft {} is being published and cannot be regenerated",
                    busy.key()
                ))
                .into());
            }
            state.selection.add_language(language.clone());
            state.selection.set_loading(&language, true);
            state.fence.issue(&language)
        };

        tracing::info!(
            property_id = %request.property_id,
            language = %language,
            channels = request.channels.len(),
            version = ticket.version,
            "Generation started",
        );
        self.emit(
            WorkflowEvent::new(event_types::GENERATION_STARTED)
                .with_property(request.property_id.clone())
                .with_payload(serde_json::json!({
                    "language": language.as_str(),
                    "channels": request.channels,
                })),
        );

        let mut pending = PendingGeneration {
            session: self.clone(),
            language: language.clone(),
            ticket,
            armed: true,
        };
        let result = self.inner.services.generator.generate_content(&request).await;

        let mut state = self.inner.state.write().await;
        pending.armed = false;
        match state.fence.check(&language, ticket) {
            Verdict::Current => {}
            verdict => {
                drop(state);
                tracing::warn!(
                    language = %language,
                    version = ticket.version,
                    ?verdict,
                    "Discarding stale generation response",
                );
                self.emit(
                    WorkflowEvent::new(event_types::GENERATION_DISCARDED)
                        .with_property(request.property_id.clone())
                        .with_payload(serde_json::json!({ "language": language.as_str() })),
                );
                return Ok(GenerationOutcome::Discarded);
            }
        }
        state.selection.set_loading(&language, false);

        let generated = match result {
            Ok(generated) => generated,
            Err(source) => {
                drop(state);
                tracing::error!(language = %language, error = %source, "Generation failed");
                self.emit(
                    WorkflowEvent::new(event_types::GENERATION_FAILED)
                        .with_property(request.property_id.clone())
                        .with_payload(serde_json::json!({
                            "language": language.as_str(),
                            "error": source.to_string(),
                            "retryable": source.is_retryable(),
                        })),
                );
                return Err(WorkflowError::GenerationFailure { language, source });
            }
        };

        let now = Self::now();
        let mut drafts: Vec<Draft> = Vec::with_capacity(generated.len());
        for item in generated {
            if !request.channels.contains(&item.channel) {
                tracing::warn!(language = %language, channel = %item.channel, "Ignoring unrequested channel");
                continue;
            }
            if drafts.iter().any(|draft| draft.channel == item.channel) {
                tracing::warn!(language = %language, channel = %item.channel, "Ignoring duplicate channel");
                continue;
            }
            drafts.push(Draft::generated(
                request.property_id.clone(),
                DraftKey::new(language.clone(), item.channel),
                item.id,
                item.content,
                now,
            ));
        }

        let replacement = state.store.replace_language(&language, drafts)?;
        let applied: Vec<Draft> = replacement
            .written
            .iter()
            .filter_map(|key| state.store.get(key).cloned())
            .collect();
        drop(state);

        if !replacement.kept.is_empty() {
            tracing::warn!(
                language = %language,
                kept = replacement.kept.len(),
                "Drafts being published were not replaced",
            );
        }
        // Without a server id a draft can be neither auto-saved nor published.
        let unsaved: Vec<Channel> = applied
            .iter()
            .filter(|draft| draft.id.is_none())
            .map(|draft| draft.channel)
            .collect();
        if !unsaved.is_empty() {
            tracing::warn!(language = %language, channels = ?unsaved, "Generated drafts have no server id");
        }
        tracing::info!(language = %language, drafts = applied.len(), "Generation completed");
        self.emit(
            WorkflowEvent::new(event_types::GENERATION_COMPLETED)
                .with_property(request.property_id)
                .with_payload(serde_json::json!({
                    "language": language.as_str(),
                    "drafts": applied.len(),
                    "unsaved": unsaved,
                })),
        );
        Ok(GenerationOutcome::Applied(applied))
    }

    /// Re-run generation for the language in view with the selected
    /// channels.
    ///
    /// Without `force`, refuses when the language has edited or ready
    /// drafts that the new generation would overwrite.
    pub async fn regenerate(&self, force: bool) -> WorkflowResult<GenerationOutcome> {
        let (property_id, language, channels, settings) = {
            let state = self.inner.state.read().await;
            let property_id = state.require_property()?;
            let language = state
                .selection
                .current_language()
                .cloned()
                .ok_or_else(|| CoreError::Validation("No language is in view".to_string()))?;

            if !force {
                let count = state
                    .store
                    .for_language(&language)
                    .filter(|draft| draft.status.has_pending_edits())
                    .count();
                if count > 0 {
                    return Err(WorkflowError::PendingEdits { language, count });
                }
            }
            (
                property_id,
                language,
                state.selection.channels().to_vec(),
                state.selection.settings,
            )
        };

        self.request_generation(
            &property_id,
            language,
            channels,
            settings.tone,
            settings.length,
            self.inner.config.agent_id.clone(),
        )
        .await
    }
}
