//! Publishing channels and their content limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Instagram caption ceiling (characters, hashtags included).
pub const INSTAGRAM_MAX_CHARS: usize = 2200;

/// Instagram rejects captions with more hashtags than this.
pub const INSTAGRAM_MAX_HASHTAGS: usize = 30;

pub const FACEBOOK_MAX_CHARS: usize = 5000;

pub const LINKEDIN_MAX_CHARS: usize = 3000;

pub const TWITTER_MAX_CHARS: usize = 280;

/// Content ceilings for one channel. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelLimits {
    pub max_chars: Option<usize>,
    pub max_hashtags: Option<usize>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A publishing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Facebook,
    Instagram,
    Website,
    Linkedin,
    Twitter,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Self::Facebook,
        Self::Instagram,
        Self::Website,
        Self::Linkedin,
        Self::Twitter,
    ];

    /// Wire representation, matching the serde encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Website => "website",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Instagram => "Instagram",
            Self::Website => "Website",
            Self::Linkedin => "LinkedIn",
            Self::Twitter => "X (Twitter)",
        }
    }

    pub fn limits(self) -> ChannelLimits {
        match self {
            Self::Instagram => ChannelLimits {
                max_chars: Some(INSTAGRAM_MAX_CHARS),
                max_hashtags: Some(INSTAGRAM_MAX_HASHTAGS),
            },
            Self::Facebook => ChannelLimits {
                max_chars: Some(FACEBOOK_MAX_CHARS),
                max_hashtags: None,
            },
            Self::Linkedin => ChannelLimits {
                max_chars: Some(LINKEDIN_MAX_CHARS),
                max_hashtags: None,
            },
            Self::Twitter => ChannelLimits {
                max_chars: Some(TWITTER_MAX_CHARS),
                max_hashtags: None,
            },
            Self::Website => ChannelLimits {
                max_chars: None,
                max_hashtags: None,
            },
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown channel '{s}'. Must be one of: {}",
                    names.join(", ")
                ))
            })
    }
}
