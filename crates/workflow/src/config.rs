use std::str::FromStr;
use std::time::Duration;

use listcast_core::error::CoreError;
use listcast_core::generation::{ContentLength, Tone};
use listcast_core::types::AgentId;

use crate::polling::PollConfig;

/// Workflow defaults loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Tone used when a language is added without explicit settings.
    pub default_tone: Tone,
    /// Length used when a language is added without explicit settings.
    pub default_length: ContentLength,
    /// Agent recorded as the editor of every change, if set.
    pub agent_id: Option<AgentId>,
    /// Backoff schedule for publish job polling.
    pub poll: PollConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_tone: Tone::default(),
            default_length: ContentLength::default(),
            agent_id: None,
            poll: PollConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default        |
    /// |------------------------------|----------------|
    /// | `LISTCAST_DEFAULT_TONE`      | `professional` |
    /// | `LISTCAST_DEFAULT_LENGTH`    | `medium`       |
    /// | `LISTCAST_AGENT_ID`          | unset          |
    /// | `LISTCAST_POLL_INITIAL_MS`   | `1000`         |
    /// | `LISTCAST_POLL_MAX_MS`       | `30000`        |
    /// | `LISTCAST_POLL_MAX_ATTEMPTS` | `20`           |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        let default_tone = parse_or(&lookup, "LISTCAST_DEFAULT_TONE", defaults.default_tone)?;
        let default_length = parse_or(&lookup, "LISTCAST_DEFAULT_LENGTH", defaults.default_length)?;
        let agent_id = lookup("LISTCAST_AGENT_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let initial_ms: u64 = parse_or(
            &lookup,
            "LISTCAST_POLL_INITIAL_MS",
            defaults.poll.initial_delay.as_millis() as u64,
        )?;
        let max_ms: u64 = parse_or(
            &lookup,
            "LISTCAST_POLL_MAX_MS",
            defaults.poll.max_delay.as_millis() as u64,
        )?;
        let max_attempts: u32 =
            parse_or(&lookup, "LISTCAST_POLL_MAX_ATTEMPTS", defaults.poll.max_attempts)?;

        if initial_ms == 0 || max_ms < initial_ms {
            return Err(CoreError::Validation(format!(
                "Poll delays must satisfy 0 < LISTCAST_POLL_INITIAL_MS ({initial_ms}) \
                 <= LISTCAST_POLL_MAX_MS ({max_ms})"
            )));
        }
        if max_attempts == 0 {
            return Err(CoreError::Validation(
                "LISTCAST_POLL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            default_tone,
            default_length,
            agent_id,
            poll: PollConfig {
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_millis(max_ms),
                max_attempts,
                ..defaults.poll
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}
