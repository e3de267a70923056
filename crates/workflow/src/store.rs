//! Draft store: the drafts of the selected property, keyed by
//! (language, channel).
//!
//! Each key holds exactly one draft, so a newer generation or edit always
//! replaces the prior draft in place. Every write bumps the slot's
//! revision, which async writers use to detect that their view is stale.

use std::collections::BTreeMap;
use std::fmt;

use listcast_core::channel::Channel;
use listcast_core::draft::{Draft, DraftKey};
use listcast_core::draft_status::DraftStatus;
use listcast_core::error::CoreError;
use listcast_core::language::Language;
use listcast_core::types::{DraftId, PropertyId};
use serde::Serialize;

/// Addresses a draft either by its server id or by its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftRef {
    Id(DraftId),
    Key(DraftKey),
}

impl From<DraftKey> for DraftRef {
    fn from(key: DraftKey) -> Self {
        Self::Key(key)
    }
}

impl From<&DraftKey> for DraftRef {
    fn from(key: &DraftKey) -> Self {
        Self::Key(key.clone())
    }
}

impl fmt::Display for DraftRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Key(key) => write!(f, "{key}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    draft: Draft,
    revision: u64,
}

/// Result of a full per-language replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacement {
    pub written: Vec<DraftKey>,
    /// Keys whose draft was mid-publish and therefore left untouched.
    pub kept: Vec<DraftKey>,
}

/// Draft counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary(BTreeMap<DraftStatus, usize>);

impl StatusSummary {
    pub fn count(&self, status: DraftStatus) -> usize {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

#[derive(Debug, Default)]
pub struct DraftStore {
    property_id: Option<PropertyId>,
    slots: BTreeMap<DraftKey, Slot>,
    next_revision: u64,
}

impl DraftStore {
    /// An empty store scoped to `property_id`.
    pub fn for_property(property_id: impl Into<PropertyId>) -> Self {
        Self {
            property_id: Some(property_id.into()),
            ..Self::default()
        }
    }

    /// Drop every draft and rescope the store. Revisions keep counting up
    /// across resets so a revision taken before the reset never matches a
    /// slot written after it.
    pub fn reset(&mut self, property_id: Option<PropertyId>) {
        self.property_id = property_id;
        self.slots.clear();
    }

    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &DraftKey) -> Option<&Draft> {
        self.slots.get(key).map(|slot| &slot.draft)
    }

    pub fn revision(&self, key: &DraftKey) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.revision)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&DraftKey> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.draft.id.as_deref() == Some(id))
            .map(|(key, _)| key)
    }

    /// Resolve a reference to the key of an existing draft.
    pub fn resolve(&self, draft: &DraftRef) -> Result<DraftKey, CoreError> {
        match draft {
            DraftRef::Key(key) if self.slots.contains_key(key) => Ok(key.clone()),
            DraftRef::Id(id) => self
                .find_by_id(id)
                .cloned()
                .ok_or_else(|| CoreError::draft_not_found(draft)),
            DraftRef::Key(_) => Err(CoreError::draft_not_found(draft)),
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn check_scope(&self, draft: &Draft) -> Result<(), CoreError> {
        match &self.property_id {
            Some(property_id) if *property_id != draft.property_id => {
                Err(CoreError::Validation(format!(
                    "Draft {} belongs to property {}, not {property_id}",
                    draft.key(),
                    draft.property_id
                )))
            }
            _ => Ok(()),
        }
    }

    /// Insert or replace the draft at its key. Returns the new revision.
    pub fn insert(&mut self, draft: Draft) -> Result<u64, CoreError> {
        self.check_scope(&draft)?;
        let revision = self.bump();
        self.slots.insert(draft.key(), Slot { draft, revision });
        Ok(revision)
    }

    /// Replace every draft of `language` with `drafts`.
    ///
    /// Drafts currently `publishing` are immutable: they survive the
    /// replace and any incoming draft for their key is dropped.
    pub fn replace_language(
        &mut self,
        language: &Language,
        drafts: Vec<Draft>,
    ) -> Result<Replacement, CoreError> {
        for draft in &drafts {
            self.check_scope(draft)?;
            if draft.language != *language {
                return Err(CoreError::Validation(format!(
                    "Draft {} does not belong to language {language}",
                    draft.key()
                )));
            }
        }

        let mut replacement = Replacement::default();
        self.slots.retain(|key, slot| {
            if key.language != *language {
                return true;
            }
            let keep = slot.draft.status == DraftStatus::Publishing;
            if keep {
                replacement.kept.push(key.clone());
            }
            keep
        });

        for draft in drafts {
            let key = draft.key();
            if replacement.kept.contains(&key) {
                continue;
            }
            let revision = self.bump();
            self.slots.insert(key.clone(), Slot { draft, revision });
            if !replacement.written.contains(&key) {
                replacement.written.push(key);
            }
        }
        Ok(replacement)
    }

    /// Apply `f` to a copy of the draft and commit it only if `f`
    /// succeeds, so a failed mutation leaves the stored draft untouched.
    pub fn update<T>(
        &mut self,
        key: &DraftKey,
        f: impl FnOnce(&mut Draft) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut draft = self
            .slots
            .get(key)
            .map(|slot| slot.draft.clone())
            .ok_or_else(|| CoreError::draft_not_found(key))?;
        let out = f(&mut draft)?;
        let revision = self.bump();
        self.slots.insert(key.clone(), Slot { draft, revision });
        Ok(out)
    }

    /// Record server-side metadata (id, timestamps) without counting as a
    /// new revision of the content.
    pub fn annotate(&mut self, key: &DraftKey, f: impl FnOnce(&mut Draft)) -> bool {
        match self.slots.get_mut(key) {
            Some(slot) => {
                f(&mut slot.draft);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Draft> {
        self.slots.values().map(|slot| &slot.draft)
    }

    pub fn for_language<'a>(&'a self, language: &'a Language) -> impl Iterator<Item = &'a Draft> {
        self.iter().filter(move |draft| draft.language == *language)
    }

    pub fn keys_with_status(&self, status: DraftStatus) -> Vec<DraftKey> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.draft.status == status)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Two-level view: language -> channel -> draft.
    pub fn by_language(&self) -> BTreeMap<Language, BTreeMap<Channel, Draft>> {
        let mut view: BTreeMap<Language, BTreeMap<Channel, Draft>> = BTreeMap::new();
        for (key, slot) in &self.slots {
            view.entry(key.language.clone())
                .or_default()
                .insert(key.channel, slot.draft.clone());
        }
        view
    }

    pub fn summary(&self) -> StatusSummary {
        let mut counts = BTreeMap::new();
        for draft in self.iter() {
            *counts.entry(draft.status).or_insert(0) += 1;
        }
        StatusSummary(counts)
    }
}
