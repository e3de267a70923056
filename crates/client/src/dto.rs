//! Wire shapes of the backend's social publishing endpoints that differ
//! from the core types.

use std::collections::BTreeMap;

use listcast_core::channel::Channel;
use listcast_core::draft::Draft;
use listcast_core::generation::GeneratedDraft;
use listcast_core::language::Language;
use listcast_core::publishing::{DraftOutcome, JobReport};
use serde::{Deserialize, Serialize};

/// `POST /api/social/generate` response.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub drafts: Vec<GeneratedDraft>,
}

/// `POST /api/social/improve` body.
#[derive(Debug, Serialize)]
pub struct ImproveBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<&'a str>,
    pub property_id: &'a str,
    pub language: &'a Language,
    pub channel: Channel,
    pub title: &'a str,
    pub body: &'a str,
    pub hashtags: &'a [String],
    pub instruction: &'a str,
}

/// `GET /api/social/drafts` response: drafts grouped by language code.
#[derive(Debug, Deserialize)]
pub struct DraftsResponse {
    #[serde(default)]
    pub drafts: BTreeMap<String, Vec<Draft>>,
}

impl DraftsResponse {
    pub fn into_drafts(self) -> Vec<Draft> {
        self.drafts.into_values().flatten().collect()
    }
}

/// `GET /api/social/publish/jobs/{job_id}` response.
#[derive(Debug, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    /// `queued`, `scheduled`, `running`, `completed`, `partial`, `failed`
    /// or `cancelled`.
    pub status: String,
    #[serde(default)]
    pub results: Vec<DraftOutcome>,
}

/// Job statuses after which the backend reports nothing new.
const SETTLED_STATUSES: &[&str] = &["completed", "partial", "failed", "cancelled"];

impl From<JobStatusResponse> for JobReport {
    fn from(response: JobStatusResponse) -> Self {
        Self {
            settled: SETTLED_STATUSES.contains(&response.status.as_str()),
            job_id: response.job_id,
            outcomes: response.results,
        }
    }
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Best human-readable message from a raw error body.
    pub fn message_from(raw: &str) -> String {
        match serde_json::from_str::<ErrorBody>(raw) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(detail),
            }) => detail,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) if raw.trim().is_empty() => "<empty body>".to_string(),
            Err(_) => raw.trim().to_string(),
        }
    }
}
