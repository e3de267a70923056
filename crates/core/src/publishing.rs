//! Publish batch request/response types.
//!
//! A batch is accepted as one job by the publishing service. Per-draft
//! results arrive either inline with the receipt or later through the
//! job status endpoint; the two are independent per draft.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DraftId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishRequest {
    pub draft_ids: Vec<DraftId>,
    /// `None` publishes immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_at: Option<Timestamp>,
}

/// Per-draft result reported by the publishing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeResult {
    Published { published_at: Timestamp },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOutcome {
    pub draft_id: DraftId,
    #[serde(flatten)]
    pub result: OutcomeResult,
}

impl DraftOutcome {
    pub fn published(draft_id: impl Into<DraftId>, published_at: Timestamp) -> Self {
        Self {
            draft_id: draft_id.into(),
            result: OutcomeResult::Published { published_at },
        }
    }

    pub fn failed(draft_id: impl Into<DraftId>, error: impl Into<String>) -> Self {
        Self {
            draft_id: draft_id.into(),
            result: OutcomeResult::Failed {
                error: error.into(),
            },
        }
    }
}

/// Immediate answer to a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishReceipt {
    pub job_id: String,
    #[serde(default)]
    pub message: String,
    /// Results already known at submission time. Usually empty for
    /// scheduled batches.
    #[serde(default, alias = "results")]
    pub outcomes: Vec<DraftOutcome>,
}

/// Status of a previously submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    /// The job will report nothing further.
    pub settled: bool,
    #[serde(default)]
    pub outcomes: Vec<DraftOutcome>,
}

/// A schedule time must lie in the future.
pub fn validate_schedule_time(schedule_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if schedule_at <= now {
        return Err(CoreError::Validation(format!(
            "Schedule time {} is not in the future",
            schedule_at.to_rfc3339()
        )));
    }
    Ok(())
}
