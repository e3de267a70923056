//! Channel limit checks and hashtag normalization.
//!
//! Limits are advisory while an agent edits (surfaced as warnings). The
//! character and hashtag-count limits are also a hard precondition when a
//! draft is put into a publish batch; hashtag spelling never is. Content
//! is never truncated to fit.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::channel::Channel;
use crate::draft::Draft;
use crate::error::CoreError;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}_]+$").expect("valid regex"));

/// Which limit a draft breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitViolation {
    TooLong {
        channel: Channel,
        limit: usize,
        actual: usize,
    },
    TooManyHashtags {
        channel: Channel,
        limit: usize,
        actual: usize,
    },
    InvalidHashtag {
        tag: String,
    },
}

impl LimitViolation {
    /// Whether the violation keeps a draft out of a publish batch.
    pub fn blocks_publishing(&self) -> bool {
        match self {
            Self::TooLong { .. } | Self::TooManyHashtags { .. } => true,
            Self::InvalidHashtag { .. } => false,
        }
    }
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong {
                channel,
                limit,
                actual,
            } => write!(
                f,
                "{} posts are limited to {limit} characters (has {actual})",
                channel.label()
            ),
            Self::TooManyHashtags {
                channel,
                limit,
                actual,
            } => write!(
                f,
                "{} posts allow at most {limit} hashtags (has {actual})",
                channel.label()
            ),
            Self::InvalidHashtag { tag } => {
                write!(f, "Hashtag '#{tag}' may only contain letters, digits and '_'")
            }
        }
    }
}

/// Every limit `draft` breaks on its channel. Empty means publishable.
pub fn check_channel_limits(draft: &Draft) -> Vec<LimitViolation> {
    let mut violations = Vec::new();
    let limits = draft.channel.limits();

    if let Some(limit) = limits.max_chars {
        let actual = draft.post_length();
        if actual > limit {
            violations.push(LimitViolation::TooLong {
                channel: draft.channel,
                limit,
                actual,
            });
        }
    }

    if let Some(limit) = limits.max_hashtags {
        let actual = draft.hashtags.len();
        if actual > limit {
            violations.push(LimitViolation::TooManyHashtags {
                channel: draft.channel,
                limit,
                actual,
            });
        }
    }

    for tag in &draft.hashtags {
        if !HASHTAG_RE.is_match(tag) {
            violations.push(LimitViolation::InvalidHashtag { tag: tag.clone() });
        }
    }

    violations
}

/// Hard form of [`check_channel_limits`], used before publishing. Only
/// violations that [block publishing](LimitViolation::blocks_publishing)
/// fail.
pub fn enforce_channel_limits(draft: &Draft) -> Result<(), CoreError> {
    let messages: Vec<String> = check_channel_limits(draft)
        .iter()
        .filter(|v| v.blocks_publishing())
        .map(ToString::to_string)
        .collect();
    if messages.is_empty() {
        return Ok(());
    }
    Err(CoreError::Validation(messages.join("; ")))
}

/// Trim tags, strip leading `#` and drop empties. Order and duplicates are
/// preserved since display order matters.
pub fn normalize_hashtags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().trim_start_matches('#').trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
