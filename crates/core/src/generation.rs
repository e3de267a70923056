//! Content generation request parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::draft::DraftContent;
use crate::error::CoreError;
use crate::language::Language;
use crate::types::{AgentId, DraftId, PropertyId};

/// Voice the generator writes in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Luxury,
    Casual,
    Urgent,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Self::Professional,
        Self::Friendly,
        Self::Luxury,
        Self::Casual,
        Self::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Luxury => "luxury",
            Self::Casual => "casual",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tone| tone.as_str() == wanted)
            .ok_or_else(|| CoreError::Validation(format!("Unknown tone '{s}'")))
    }
}

/// Target length of the generated copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ContentLength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for ContentLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentLength {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            _ => Err(CoreError::Validation(format!("Unknown content length '{s}'"))),
        }
    }
}

/// One call to the content generation service: every requested channel
/// for a single language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub property_id: PropertyId,
    pub language: Language,
    pub channels: Vec<Channel>,
    pub tone: Tone,
    pub length: ContentLength,
    pub agent_id: Option<AgentId>,
}

impl GenerationRequest {
    /// Build a request, deduplicating channels while keeping their order.
    pub fn new(
        property_id: impl Into<PropertyId>,
        language: Language,
        channels: impl IntoIterator<Item = Channel>,
        tone: Tone,
        length: ContentLength,
        agent_id: Option<AgentId>,
    ) -> Result<Self, CoreError> {
        let mut unique = Vec::new();
        for channel in channels {
            if !unique.contains(&channel) {
                unique.push(channel);
            }
        }

        let request = Self {
            property_id: property_id.into(),
            language,
            channels: unique,
            tone,
            length,
            agent_id,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.property_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Generation requires a property".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(CoreError::Validation(
                "Generation requires at least one channel".to_string(),
            ));
        }
        Ok(())
    }
}

/// One channel's worth of generated content returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratedDraft {
    /// Set when the service persisted the draft while generating it.
    #[serde(default)]
    pub id: Option<DraftId>,
    pub channel: Channel,
    #[serde(flatten)]
    pub content: DraftContent,
}
