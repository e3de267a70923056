//! Local export of ready drafts.
//!
//! Renders the publishable content (channel, language, title, body,
//! hashtags) so an agent can post manually or archive it. No network.

use serde::Serialize;

use crate::channel::Channel;
use crate::draft::Draft;
use crate::draft_status::DraftStatus;
use crate::error::CoreError;
use crate::language::Language;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(CoreError::Validation(format!(
                "Unknown export format '{other}'"
            ))),
        }
    }
}

/// One exported draft.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRecord<'a> {
    pub channel: Channel,
    pub language: &'a Language,
    pub title: &'a str,
    pub body: &'a str,
    pub hashtags: &'a [String],
}

impl<'a> From<&'a Draft> for ExportRecord<'a> {
    fn from(draft: &'a Draft) -> Self {
        Self {
            channel: draft.channel,
            language: &draft.language,
            title: &draft.title,
            body: &draft.body,
            hashtags: &draft.hashtags,
        }
    }
}

/// Render every `ready` draft in `drafts`; other statuses are skipped.
pub fn render_ready<'a, I>(drafts: I, format: ExportFormat) -> Result<String, CoreError>
where
    I: IntoIterator<Item = &'a Draft>,
{
    let records: Vec<ExportRecord<'a>> = drafts
        .into_iter()
        .filter(|draft| draft.status == DraftStatus::Ready)
        .map(ExportRecord::from)
        .collect();

    if records.is_empty() {
        return Err(CoreError::Validation(
            "There are no ready drafts to export".to_string(),
        ));
    }

    match format {
        ExportFormat::Json => serde_json::to_string_pretty(&records)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize export: {e}"))),
        ExportFormat::Text => Ok(render_text(&records)),
    }
}

fn render_text(records: &[ExportRecord<'_>]) -> String {
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push_str("\n----------------------------------------\n\n");
        }
        out.push_str(&format!(
            "[{} | {}] {}\n\n{}\n",
            record.channel.label(),
            record.language,
            record.title,
            record.body
        ));
        if !record.hashtags.is_empty() {
            let tags: Vec<String> = record.hashtags.iter().map(|t| format!("#{t}")).collect();
            out.push_str(&format!("\n{}\n", tags.join(" ")));
        }
    }
    out
}

/// File name for an export, e.g. `listing-prop-1-20260301-0900.json`.
pub fn export_file_name(property_id: &str, format: ExportFormat, now: Timestamp) -> String {
    let safe: String = property_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!(
        "listing-{safe}-{}.{}",
        now.format("%Y%m%d-%H%M"),
        format.extension()
    )
}
