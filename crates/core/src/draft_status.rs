//! Draft status values and the lifecycle state machine.
//!
//! Every status change a draft goes through is expressed as a
//! [`DraftAction`] applied to its current [`DraftStatus`]. The table in
//! [`state_machine::next_status`] is the single source of truth; callers
//! never assign a status directly.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a single draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Persisted without generated content (manual or legacy drafts).
    Draft,
    /// Freshly produced by the content generation service.
    Generated,
    /// Modified by an agent after generation.
    Edited,
    /// Reviewed and eligible for batch publishing.
    Ready,
    /// Submitted in a publish batch, awaiting the per-draft result.
    Publishing,
    /// Confirmed live on its channel.
    Published,
    /// Publishing failed. Editing the draft makes it retryable.
    Failed,
}

impl DraftStatus {
    pub const ALL: [DraftStatus; 7] = [
        Self::Draft,
        Self::Generated,
        Self::Edited,
        Self::Ready,
        Self::Publishing,
        Self::Published,
        Self::Failed,
    ];

    /// Wire representation, matching the serde encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generated => "generated",
            Self::Edited => "edited",
            Self::Ready => "ready",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Generated => "Generated",
            Self::Edited => "Edited",
            Self::Ready => "Ready",
            Self::Publishing => "Publishing",
            Self::Published => "Published",
            Self::Failed => "Failed",
        }
    }

    /// `published` and `failed` end a publish attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }

    /// Whether the editor may change the draft's fields.
    pub fn is_editable(self) -> bool {
        state_machine::can_apply(self, DraftAction::Edit)
    }

    /// Whether the draft carries work an agent would lose on regeneration.
    pub fn has_pending_edits(self) -> bool {
        matches!(self, Self::Edited | Self::Ready)
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown draft status '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Something that can happen to a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftAction {
    /// Any field mutation by the editor (title, body, hashtags, contact).
    Edit,
    MarkReady,
    /// Orchestrator only: optimistic move into a publish batch.
    MarkPublishing,
    /// Orchestrator only.
    MarkPublished,
    /// Orchestrator only.
    MarkFailed,
}

impl DraftAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::MarkReady => "mark ready",
            Self::MarkPublishing => "publish",
            Self::MarkPublished => "mark published",
            Self::MarkFailed => "mark failed",
        }
    }
}

impl fmt::Display for DraftAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::{DraftAction, DraftStatus};
    use crate::error::CoreError;

    /// The status a draft ends up in after `action`, or `None` if the
    /// action is not allowed from `from`.
    ///
    /// `Generated` never appears as a target: only drafts constructed by
    /// the generation coordinator start there.
    pub fn target(from: DraftStatus, action: DraftAction) -> Option<DraftStatus> {
        use DraftAction as A;
        use DraftStatus as S;

        match (from, action) {
            (S::Draft | S::Generated | S::Edited | S::Ready | S::Failed, A::Edit) => {
                Some(S::Edited)
            }
            // Ready -> Ready keeps mark_ready idempotent.
            (S::Generated | S::Edited | S::Ready, A::MarkReady) => Some(S::Ready),
            (S::Ready, A::MarkPublishing) => Some(S::Publishing),
            (S::Publishing, A::MarkPublished) => Some(S::Published),
            (S::Publishing, A::MarkFailed) => Some(S::Failed),
            _ => None,
        }
    }

    /// Check whether `action` is allowed from `from`.
    pub fn can_apply(from: DraftStatus, action: DraftAction) -> bool {
        target(from, action).is_some()
    }

    /// Validate a transition, returning the new status.
    pub fn next_status(from: DraftStatus, action: DraftAction) -> Result<DraftStatus, CoreError> {
        target(from, action).ok_or(CoreError::InvalidTransition { from, action })
    }

    /// Every action allowed from `from`.
    pub fn valid_actions(from: DraftStatus) -> Vec<DraftAction> {
        [
            DraftAction::Edit,
            DraftAction::MarkReady,
            DraftAction::MarkPublishing,
            DraftAction::MarkPublished,
            DraftAction::MarkFailed,
        ]
        .into_iter()
        .filter(|action| can_apply(from, *action))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::*;
    use crate::error::CoreError;

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    #[test]
    fn edit_from_review_states_lands_in_edited() {
        for from in [
            DraftStatus::Draft,
            DraftStatus::Generated,
            DraftStatus::Edited,
            DraftStatus::Ready,
        ] {
            assert_eq!(next_status(from, DraftAction::Edit), Ok(DraftStatus::Edited));
        }
    }

    #[test]
    fn edit_reopens_failed_draft() {
        assert_eq!(
            next_status(DraftStatus::Failed, DraftAction::Edit),
            Ok(DraftStatus::Edited)
        );
    }

    #[test]
    fn edit_rejected_while_publishing() {
        assert_eq!(
            next_status(DraftStatus::Publishing, DraftAction::Edit),
            Err(CoreError::InvalidTransition {
                from: DraftStatus::Publishing,
                action: DraftAction::Edit,
            })
        );
    }

    #[test]
    fn edit_rejected_once_published() {
        assert!(!can_apply(DraftStatus::Published, DraftAction::Edit));
    }

    // -----------------------------------------------------------------------
    // Mark ready
    // -----------------------------------------------------------------------

    #[test]
    fn mark_ready_from_generated_and_edited() {
        assert!(can_apply(DraftStatus::Generated, DraftAction::MarkReady));
        assert!(can_apply(DraftStatus::Edited, DraftAction::MarkReady));
    }

    #[test]
    fn mark_ready_is_idempotent() {
        let once = next_status(DraftStatus::Edited, DraftAction::MarkReady).unwrap();
        let twice = next_status(once, DraftAction::MarkReady).unwrap();
        assert_eq!(once, DraftStatus::Ready);
        assert_eq!(twice, DraftStatus::Ready);
    }

    #[test]
    fn mark_ready_rejected_from_publish_states() {
        for from in [
            DraftStatus::Publishing,
            DraftStatus::Published,
            DraftStatus::Failed,
        ] {
            assert!(!can_apply(from, DraftAction::MarkReady), "{from}");
        }
    }

    #[test]
    fn mark_ready_rejected_for_blank_draft() {
        assert!(!can_apply(DraftStatus::Draft, DraftAction::MarkReady));
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    #[test]
    fn only_ready_drafts_enter_publishing() {
        for from in DraftStatus::ALL {
            let allowed = can_apply(from, DraftAction::MarkPublishing);
            assert_eq!(allowed, from == DraftStatus::Ready, "{from}");
        }
    }

    #[test]
    fn publishing_resolves_to_published_or_failed() {
        assert_eq!(
            next_status(DraftStatus::Publishing, DraftAction::MarkPublished),
            Ok(DraftStatus::Published)
        );
        assert_eq!(
            next_status(DraftStatus::Publishing, DraftAction::MarkFailed),
            Ok(DraftStatus::Failed)
        );
    }

    #[test]
    fn outcome_actions_rejected_outside_publishing() {
        assert!(!can_apply(DraftStatus::Ready, DraftAction::MarkPublished));
        assert!(!can_apply(DraftStatus::Published, DraftAction::MarkFailed));
    }

    #[test]
    fn nothing_re_enters_generated() {
        for from in DraftStatus::ALL {
            for action in valid_actions(from) {
                assert_ne!(target(from, action), Some(DraftStatus::Generated));
            }
        }
    }

    #[test]
    fn published_accepts_no_actions() {
        assert!(valid_actions(DraftStatus::Published).is_empty());
    }

    // -----------------------------------------------------------------------
    // Display / parsing
    // -----------------------------------------------------------------------

    #[test]
    fn status_parses_from_wire_name() {
        assert_eq!("publishing".parse::<DraftStatus>(), Ok(DraftStatus::Publishing));
        assert!("archived".parse::<DraftStatus>().is_err());
    }

    #[test]
    fn invalid_transition_message_names_status_and_action() {
        let err = next_status(DraftStatus::Publishing, DraftAction::Edit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot edit a draft that is publishing"
        );
    }

    #[test]
    fn pending_edits_cover_edited_and_ready() {
        assert!(DraftStatus::Edited.has_pending_edits());
        assert!(DraftStatus::Ready.has_pending_edits());
        assert!(!DraftStatus::Generated.has_pending_edits());
    }
}
