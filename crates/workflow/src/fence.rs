//! Request fencing for generation responses.
//!
//! Every generation request takes a [`Ticket`]: the property epoch it was
//! issued under plus a per-language version. A response is only applied if
//! its ticket is still the latest one for its language in the current
//! epoch. Selecting another property advances the epoch, which makes every
//! outstanding ticket stale at once.

use std::collections::HashMap;

use listcast_core::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub epoch: u64,
    pub version: u64,
}

/// What to do with a response carrying a given ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Latest request for the language: apply it.
    Current,
    /// A newer request for the same language is outstanding.
    Superseded,
    /// Issued for a property that is no longer selected.
    StaleProperty,
}

#[derive(Debug, Default)]
pub struct GenerationFence {
    epoch: u64,
    next_version: u64,
    latest: HashMap<Language, u64>,
}

impl GenerationFence {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Invalidate every outstanding ticket. Returns the new epoch.
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.latest.clear();
        self.epoch
    }

    /// Issue a ticket that supersedes all earlier ones for `language`.
    pub fn issue(&mut self, language: &Language) -> Ticket {
        self.next_version += 1;
        self.latest.insert(language.clone(), self.next_version);
        Ticket {
            epoch: self.epoch,
            version: self.next_version,
        }
    }

    pub fn check(&self, language: &Language, ticket: Ticket) -> Verdict {
        if ticket.epoch != self.epoch {
            return Verdict::StaleProperty;
        }
        match self.latest.get(language) {
            Some(&latest) if latest == ticket.version => Verdict::Current,
            _ => Verdict::Superseded,
        }
    }
}
