use std::path::PathBuf;

use chrono::{DateTime, Utc};
use listcast_core::channel::Channel;
use listcast_core::error::CoreError;
use listcast_core::export::ExportFormat;
use listcast_core::language::Language;

/// What a run should generate and where it should publish.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub property_id: String,
    pub languages: Vec<Language>,
    pub channels: Vec<Channel>,
    /// `None` publishes immediately.
    pub schedule_at: Option<DateTime<Utc>>,
    /// Export the ready drafts here before publishing, if set.
    pub export_dir: Option<PathBuf>,
    pub export_format: ExportFormat,
}

impl RunSettings {
    /// Load run settings from environment variables.
    ///
    /// | Env Var                  | Required | Default              |
    /// |--------------------------|----------|----------------------|
    /// | `LISTCAST_PROPERTY_ID`   | yes      | --                   |
    /// | `LISTCAST_LANGUAGES`     | no       | `en`                 |
    /// | `LISTCAST_CHANNELS`      | no       | `facebook,instagram` |
    /// | `LISTCAST_SCHEDULE_AT`   | no       | publish now          |
    /// | `LISTCAST_EXPORT_DIR`    | no       | no export            |
    /// | `LISTCAST_EXPORT_FORMAT` | no       | `json`               |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let property_id = value("LISTCAST_PROPERTY_ID").ok_or_else(|| {
            CoreError::Validation("LISTCAST_PROPERTY_ID environment variable is required".to_string())
        })?;

        let languages = parse_list(&value("LISTCAST_LANGUAGES").unwrap_or_else(|| "en".into()))?;
        let channels =
            parse_list(&value("LISTCAST_CHANNELS").unwrap_or_else(|| "facebook,instagram".into()))?;
        if languages.is_empty() || channels.is_empty() {
            return Err(CoreError::Validation(
                "At least one language and one channel are required".to_string(),
            ));
        }

        let schedule_at = value("LISTCAST_SCHEDULE_AT")
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| {
                        CoreError::Validation(format!(
                            "LISTCAST_SCHEDULE_AT must be an RFC 3339 timestamp, got '{raw}': {e}"
                        ))
                    })
            })
            .transpose()?;

        let export_format = match value("LISTCAST_EXPORT_FORMAT") {
            Some(raw) => raw.parse()?,
            None => ExportFormat::Json,
        };

        Ok(Self {
            property_id,
            languages,
            channels,
            schedule_at,
            export_dir: value("LISTCAST_EXPORT_DIR").map(PathBuf::from),
            export_format,
        })
    }
}

/// Parse a comma-separated list, dropping blanks and duplicates.
fn parse_list<T>(raw: &str) -> Result<Vec<T>, CoreError>
where
    T: std::str::FromStr<Err = CoreError> + PartialEq,
{
    let mut items = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let item = part.parse::<T>()?;
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Ok(items)
}
