//! The draft model: one piece of content for a (property, language,
//! channel) triple, plus the field patch the editor applies to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::draft_status::{state_machine, DraftAction, DraftStatus};
use crate::error::CoreError;
use crate::language::Language;
use crate::types::{AgentId, DraftId, MediaId, PropertyId, Timestamp};
use crate::validation::normalize_hashtags;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Composite key addressing the single draft for a language/channel pair
/// within the selected property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    pub language: Language,
    pub channel: Channel,
}

impl DraftKey {
    pub fn new(language: Language, channel: Channel) -> Self {
        Self { language, channel }
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language, self.channel)
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// The editable content of a draft, as produced by the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<MediaId>,
    #[serde(default)]
    pub contact_included: bool,
}

/// Partial update of the editor-owned fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_included: Option<bool>,
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.hashtags.is_none()
            && self.contact_included.is_none()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashtags = Some(hashtags.into_iter().map(Into::into).collect());
        self
    }

    pub fn contact_included(mut self, included: bool) -> Self {
        self.contact_included = Some(included);
        self
    }

    /// A patch that overwrites title, body and hashtags with `content`.
    pub fn from_content(content: &DraftContent) -> Self {
        Self {
            title: Some(content.title.clone()),
            body: Some(content.body.clone()),
            hashtags: Some(content.hashtags.clone()),
            contact_included: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub id: Option<DraftId>,
    pub property_id: PropertyId,
    pub language: Language,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<MediaId>,
    #[serde(default)]
    pub contact_included: bool,
    pub status: DraftStatus,
    #[serde(default)]
    pub edited_by: Option<AgentId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub published_at: Option<Timestamp>,
    #[serde(default)]
    pub scheduled_at: Option<Timestamp>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Draft {
    /// A draft fresh from the content generation service.
    pub fn generated(
        property_id: impl Into<PropertyId>,
        key: DraftKey,
        id: Option<DraftId>,
        content: DraftContent,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            property_id: property_id.into(),
            language: key.language,
            channel: key.channel,
            title: content.title,
            body: content.body,
            hashtags: normalize_hashtags(content.hashtags),
            media_ids: content.media_ids,
            contact_included: content.contact_included,
            status: DraftStatus::Generated,
            edited_by: None,
            created_at: now,
            updated_at: now,
            published_at: None,
            scheduled_at: None,
            error_message: None,
        }
    }

    pub fn key(&self) -> DraftKey {
        DraftKey::new(self.language.clone(), self.channel)
    }

    /// The post text as the channel will count it: body followed by the
    /// hashtag line.
    pub fn compose_post(&self) -> String {
        if self.hashtags.is_empty() {
            return self.body.clone();
        }
        let tags: Vec<String> = self.hashtags.iter().map(|t| format!("#{t}")).collect();
        format!("{}\n\n{}", self.body, tags.join(" "))
    }

    /// Character count of [`compose_post`](Self::compose_post).
    pub fn post_length(&self) -> usize {
        self.compose_post().chars().count()
    }

    // ---- lifecycle ----

    /// Apply an editor patch. All fields change or none do; the draft ends
    /// up `edited`.
    pub fn apply_patch(
        &mut self,
        patch: &DraftPatch,
        editor: Option<&str>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if patch.is_empty() {
            return Err(CoreError::Validation(
                "Draft update must change at least one field".to_string(),
            ));
        }
        let next = state_machine::next_status(self.status, DraftAction::Edit)?;

        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(body) = &patch.body {
            self.body = body.clone();
        }
        if let Some(hashtags) = &patch.hashtags {
            self.hashtags = normalize_hashtags(hashtags.clone());
        }
        if let Some(included) = patch.contact_included {
            self.contact_included = included;
        }

        self.status = next;
        self.error_message = None;
        if let Some(editor) = editor {
            self.edited_by = Some(editor.to_string());
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `ready`. Returns `false` when the draft already was ready.
    pub fn mark_ready(&mut self, now: Timestamp) -> Result<bool, CoreError> {
        let next = state_machine::next_status(self.status, DraftAction::MarkReady)?;
        if next == self.status {
            return Ok(false);
        }
        self.status = next;
        self.updated_at = now;
        Ok(true)
    }

    pub fn mark_publishing(
        &mut self,
        scheduled_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.status = state_machine::next_status(self.status, DraftAction::MarkPublishing)?;
        self.scheduled_at = scheduled_at;
        self.error_message = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_published(&mut self, published_at: Timestamp) -> Result<(), CoreError> {
        self.status = state_machine::next_status(self.status, DraftAction::MarkPublished)?;
        self.published_at = Some(published_at);
        self.updated_at = published_at;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: Timestamp) -> Result<(), CoreError> {
        self.status = state_machine::next_status(self.status, DraftAction::MarkFailed)?;
        self.error_message = Some(error.into());
        self.updated_at = now;
        Ok(())
    }
}
