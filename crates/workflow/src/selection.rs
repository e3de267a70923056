//! Selection state: the property being worked on, the languages and
//! channels chosen for it, the pair currently in view and which languages
//! have a generation in flight.

use std::collections::BTreeMap;

use listcast_core::channel::Channel;
use listcast_core::draft::{Draft, DraftKey};
use listcast_core::generation::{ContentLength, Tone};
use listcast_core::language::Language;
use listcast_core::types::PropertyId;

/// Tone and length used for the next generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSettings {
    pub tone: Tone,
    pub length: ContentLength,
}

#[derive(Debug, Default)]
pub struct Selection {
    property_id: Option<PropertyId>,
    languages: Vec<Language>,
    channels: Vec<Channel>,
    current_language: Option<Language>,
    current_channel: Option<Channel>,
    loading: BTreeMap<Language, bool>,
    pub settings: GenerationSettings,
}

impl Selection {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Reset everything except the generation settings and select
    /// `property_id`.
    pub fn select(&mut self, property_id: impl Into<PropertyId>) {
        *self = Self {
            property_id: Some(property_id.into()),
            ..Self::new(self.settings)
        };
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.settings);
    }

    /// Returns `true` if the language was not selected yet.
    pub fn add_language(&mut self, language: Language) -> bool {
        if self.languages.contains(&language) {
            return false;
        }
        if self.current_language.is_none() {
            self.current_language = Some(language.clone());
        }
        self.languages.push(language);
        true
    }

    /// Returns `true` if the language was selected.
    pub fn remove_language(&mut self, language: &Language) -> bool {
        let before = self.languages.len();
        self.languages.retain(|l| l != language);
        if self.languages.len() == before {
            return false;
        }
        self.loading.remove(language);
        if self.current_language.as_ref() == Some(language) {
            self.current_language = self.languages.first().cloned();
        }
        true
    }

    pub fn add_channel(&mut self, channel: Channel) -> bool {
        if self.channels.contains(&channel) {
            return false;
        }
        if self.current_channel.is_none() {
            self.current_channel = Some(channel);
        }
        self.channels.push(channel);
        true
    }

    pub fn remove_channel(&mut self, channel: Channel) -> bool {
        let before = self.channels.len();
        self.channels.retain(|c| *c != channel);
        if self.channels.len() == before {
            return false;
        }
        if self.current_channel == Some(channel) {
            self.current_channel = self.channels.first().copied();
        }
        true
    }

    pub fn set_channels(&mut self, channels: impl IntoIterator<Item = Channel>) {
        self.channels.clear();
        for channel in channels {
            if !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        }
        if !self
            .current_channel
            .is_some_and(|current| self.channels.contains(&current))
        {
            self.current_channel = self.channels.first().copied();
        }
    }

    pub fn set_current(&mut self, language: Language, channel: Channel) {
        self.current_language = Some(language);
        self.current_channel = Some(channel);
    }

    pub fn current_language(&self) -> Option<&Language> {
        self.current_language.as_ref()
    }

    pub fn current_channel(&self) -> Option<Channel> {
        self.current_channel
    }

    pub fn current(&self) -> Option<DraftKey> {
        Some(DraftKey::new(self.current_language.clone()?, self.current_channel?))
    }

    pub fn set_loading(&mut self, language: &Language, loading: bool) {
        self.loading.insert(language.clone(), loading);
    }

    pub fn is_loading(&self, language: &Language) -> bool {
        self.loading.get(language).copied().unwrap_or(false)
    }

    pub fn loading_states(&self) -> &BTreeMap<Language, bool> {
        &self.loading
    }

    /// Select every language and channel that has a persisted draft.
    pub fn derive_from<'a>(&mut self, drafts: impl IntoIterator<Item = &'a Draft>) {
        for draft in drafts {
            self.add_language(draft.language.clone());
            self.add_channel(draft.channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    #[test]
    fn first_language_and_channel_become_current() {
        let mut selection = Selection::default();
        selection.select("prop-1");
        assert!(selection.add_language(lang("hi")));
        assert!(selection.add_language(lang("en")));
        assert!(!selection.add_language(lang("en")));
        selection.add_channel(Channel::Instagram);

        assert_eq!(selection.languages(), &[lang("hi"), lang("en")]);
        assert_eq!(
            selection.current(),
            Some(DraftKey::new(lang("hi"), Channel::Instagram))
        );
    }

    #[test]
    fn removing_current_language_moves_view() {
        let mut selection = Selection::default();
        selection.add_language(lang("en"));
        selection.add_language(lang("hi"));
        selection.set_loading(&lang("en"), true);

        assert!(selection.remove_language(&lang("en")));
        assert_eq!(selection.current_language(), Some(&lang("hi")));
        assert!(!selection.is_loading(&lang("en")));
        assert!(!selection.remove_language(&lang("en")));
    }

    #[test]
    fn set_channels_dedupes_and_keeps_current() {
        let mut selection = Selection::default();
        selection.add_channel(Channel::Linkedin);
        selection.set_channels([Channel::Facebook, Channel::Linkedin, Channel::Facebook]);

        assert_eq!(selection.channels(), &[Channel::Facebook, Channel::Linkedin]);
        assert_eq!(selection.current_channel(), Some(Channel::Linkedin));

        selection.set_channels([Channel::Twitter]);
        assert_eq!(selection.current_channel(), Some(Channel::Twitter));
    }

    #[test]
    fn select_resets_but_keeps_settings() {
        let mut selection = Selection::new(GenerationSettings {
            tone: Tone::Luxury,
            length: ContentLength::Long,
        });
        selection.select("prop-1");
        selection.add_language(lang("en"));
        selection.select("prop-2");

        assert_eq!(selection.property_id(), Some("prop-2"));
        assert!(selection.languages().is_empty());
        assert_eq!(selection.settings.tone, Tone::Luxury);
    }
}
