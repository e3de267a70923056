//! Content language codes.
//!
//! Languages are BCP-47-like tags: a supported primary subtag, optionally
//! followed by a region (`en`, `en-IN`, `pt-BR`). Parsing normalizes the
//! separator and casing so `en_in` and `EN-in` address the same drafts.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Primary subtags the content generation service can write in.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "hi", "bn", "gu", "kn", "ml", "mr", "pa", "ta", "te", "ur", "ar", "de", "es", "fr",
    "it", "ja", "pt", "ru", "zh",
];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{2,3})(?:[-_]([A-Za-z]{2}|[0-9]{3}))?$").expect("valid regex")
});

/// A validated, normalized language tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Parse and normalize a language tag.
    pub fn parse(tag: &str) -> Result<Self, CoreError> {
        let trimmed = tag.trim();
        let caps = TAG_RE.captures(trimmed).ok_or_else(|| {
            CoreError::Validation(format!("'{trimmed}' is not a valid language tag"))
        })?;

        let primary = caps[1].to_ascii_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&primary.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unsupported language '{primary}'. Must be one of: {}",
                SUPPORTED_LANGUAGES.join(", ")
            )));
        }

        let normalized = match caps.get(2) {
            Some(region) => format!("{primary}-{}", region.as_str().to_ascii_uppercase()),
            None => primary,
        };
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary subtag (`en` for `en-IN`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}
