//! Publish/schedule orchestrator.
//!
//! Ready drafts are checked against their channel limits, moved to
//! `publishing` optimistically and submitted as a single batch. Per-draft
//! results (inline with the receipt or from job status polling) then move
//! each draft to `published` or `failed` independently.

use std::collections::HashMap;

use listcast_core::draft::DraftKey;
use listcast_core::draft_status::{DraftAction, DraftStatus};
use listcast_core::error::CoreError;
use listcast_core::publishing::{validate_schedule_time, DraftOutcome, OutcomeResult, PublishRequest};
use listcast_core::types::{DraftId, Timestamp};
use listcast_core::validation::enforce_channel_limits;
use listcast_events::{event_types, WorkflowEvent};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::session::{PublishingSession, SessionState, TrackedJob};
use crate::store::DraftRef;

/// A draft left out of a batch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRejection {
    pub draft: DraftRef,
    /// `None` when the reference did not resolve to a draft.
    pub key: Option<DraftKey>,
    pub error: CoreError,
}

/// Result of submitting a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub batch_id: Uuid,
    /// `None` when every draft was rejected and nothing was sent.
    pub job_id: Option<String>,
    pub message: String,
    pub scheduled_at: Option<Timestamp>,
    pub submitted: Vec<DraftKey>,
    pub rejected: Vec<BatchRejection>,
    pub published: Vec<DraftKey>,
    pub failed: Vec<DraftKey>,
    /// Submitted drafts still awaiting a result.
    pub pending: Vec<DraftKey>,
}

/// Where a submitted job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: String,
    pub published: Vec<DraftKey>,
    pub failed: Vec<DraftKey>,
    pub pending: Vec<DraftKey>,
}

impl JobProgress {
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A per-draft result that was applied to the store.
struct Settled {
    key: DraftKey,
    error: Option<String>,
}

const MISSING_RESULT: &str = "Publishing service reported no result for this draft";

impl PublishingSession {
    /// Publish the given ready drafts now.
    pub async fn publish(&self, drafts: Vec<DraftRef>) -> WorkflowResult<PublishReport> {
        self.submit(drafts, None).await
    }

    /// Schedule the given ready drafts for `at`, which must be in the
    /// future.
    pub async fn schedule(&self, drafts: Vec<DraftRef>, at: Timestamp) -> WorkflowResult<PublishReport> {
        validate_schedule_time(at, Self::now())?;
        self.submit(drafts, Some(at)).await
    }

    /// Publish every ready draft across all languages and channels.
    pub async fn publish_ready(&self) -> WorkflowResult<PublishReport> {
        let drafts = self.ready_refs().await?;
        self.submit(drafts, None).await
    }

    pub async fn schedule_ready(&self, at: Timestamp) -> WorkflowResult<PublishReport> {
        validate_schedule_time(at, Self::now())?;
        let drafts = self.ready_refs().await?;
        self.submit(drafts, Some(at)).await
    }

    /// Fetch a job's status once and apply the per-draft results.
    ///
    /// Once the service reports the job settled, drafts it never reported
    /// on are marked failed.
    pub async fn reconcile_job(&self, job_id: &str) -> WorkflowResult<JobProgress> {
        let keys = self.job_keys(job_id).await?;
        let report = self.inner.services.publisher.job_status(job_id).await.inspect_err(
            |e| tracing::error!(job_id, error = %e, "Failed to fetch job status"),
        )?;

        let (settled, progress) = {
            let mut state = self.inner.state.write().await;
            let settled = apply_outcomes(&mut state, job_id, &report.outcomes, report.settled);
            (settled, progress_of(&state, job_id, &keys))
        };
        self.emit_settled(settled);

        tracing::debug!(
            job_id,
            settled = report.settled,
            pending = progress.pending.len(),
            "Job reconciled",
        );
        Ok(progress)
    }

    /// Poll a job with exponential backoff until every draft has a result,
    /// the attempt budget runs out or `cancel` fires. Returns the progress
    /// at that point. There is no automatic retry of failed status calls.
    pub async fn await_job(&self, job_id: &str, cancel: &CancellationToken) -> WorkflowResult<JobProgress> {
        let keys = self.job_keys(job_id).await?;
        let config = &self.inner.config.poll;

        for (attempt, delay) in (1u32..).zip(config.schedule()) {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id, attempt, "Job polling cancelled");
                    let state = self.inner.state.read().await;
                    return Ok(progress_of(&state, job_id, &keys));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let progress = self.reconcile_job(job_id).await?;
            if progress.is_settled() {
                tracing::info!(
                    job_id,
                    attempt,
                    published = progress.published.len(),
                    failed = progress.failed.len(),
                    "Publish job settled",
                );
                return Ok(progress);
            }
        }

        tracing::warn!(job_id, attempts = config.max_attempts, "Gave up waiting for publish job");
        let state = self.inner.state.read().await;
        Ok(progress_of(&state, job_id, &keys))
    }

    // ---- private helpers ----

    async fn ready_refs(&self) -> WorkflowResult<Vec<DraftRef>> {
        let state = self.inner.state.read().await;
        state.require_property()?;
        let ready = state.store.keys_with_status(DraftStatus::Ready);
        if ready.is_empty() {
            return Err(CoreError::Validation("There are no ready drafts to publish".to_string()).into());
        }
        Ok(ready.into_iter().map(DraftRef::Key).collect())
    }

    async fn job_keys(&self, job_id: &str) -> WorkflowResult<Vec<DraftKey>> {
        let state = self.inner.state.read().await;
        let job = state.jobs.get(job_id).ok_or_else(|| CoreError::NotFound {
            entity: "publish job",
            key: job_id.to_string(),
        })?;
        let mut keys: Vec<DraftKey> = job.drafts.values().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn submit(&self, drafts: Vec<DraftRef>, scheduled_at: Option<Timestamp>) -> WorkflowResult<PublishReport> {
        if drafts.is_empty() {
            return Err(CoreError::Validation("Select at least one draft to publish".to_string()).into());
        }
        let batch_id = Uuid::now_v7();
        let now = Self::now();

        let (property_id, accepted, rejected) = {
            let mut state = self.inner.state.write().await;
            let property_id = state.require_property()?;
            let mut accepted: Vec<(DraftId, DraftKey)> = Vec::new();
            let mut rejected: Vec<BatchRejection> = Vec::new();

            for draft in drafts {
                let key = match state.store.resolve(&draft) {
                    Ok(key) => key,
                    Err(error) => {
                        rejected.push(BatchRejection { draft, key: None, error });
                        continue;
                    }
                };
                if accepted.iter().any(|(_, k)| *k == key) {
                    continue;
                }
                match admit(&mut state, &key, scheduled_at, now) {
                    Ok(id) => accepted.push((id, key)),
                    Err(error) => rejected.push(BatchRejection {
                        draft,
                        key: Some(key),
                        error,
                    }),
                }
            }
            (property_id, accepted, rejected)
        };

        for rejection in &rejected {
            tracing::warn!(
                batch_id = %batch_id,
                draft = %rejection.draft,
                error = %rejection.error,
                "Draft left out of batch",
            );
            let mut event = WorkflowEvent::new(event_types::PUBLISH_REJECTED)
                .with_property(property_id.clone())
                .with_payload(serde_json::json!({ "error": rejection.error.to_string() }));
            if let Some(key) = &rejection.key {
                event = event.with_draft(key.clone());
            }
            self.emit(event);
        }

        let submitted: Vec<DraftKey> = accepted.iter().map(|(_, key)| key.clone()).collect();
        let mut report = PublishReport {
            batch_id,
            job_id: None,
            message: String::new(),
            scheduled_at,
            submitted: submitted.clone(),
            rejected,
            published: Vec::new(),
            failed: Vec::new(),
            pending: Vec::new(),
        };
        if accepted.is_empty() {
            tracing::warn!(batch_id = %batch_id, "Every draft was rejected; nothing submitted");
            return Ok(report);
        }

        let request = PublishRequest {
            draft_ids: accepted.iter().map(|(id, _)| id.clone()).collect(),
            schedule_at: scheduled_at,
        };
        tracing::info!(
            batch_id = %batch_id,
            drafts = request.draft_ids.len(),
            scheduled = scheduled_at.is_some(),
            "Submitting publish batch",
        );

        let receipt = match self.inner.services.publisher.publish_drafts(&request).await {
            Ok(receipt) => receipt,
            Err(source) => {
                {
                    let mut state = self.inner.state.write().await;
                    if state.store.property_id() == Some(property_id.as_str()) {
                        let now = Self::now();
                        for key in &submitted {
                            if state.store.get(key).map(|d| d.status) == Some(DraftStatus::Publishing) {
                                let message = source.to_string();
                                let _ = state.store.update(key, |d| d.mark_failed(message, now));
                            }
                        }
                    }
                }
                tracing::error!(batch_id = %batch_id, error = %source, "Publish batch failed");
                self.emit(
                    WorkflowEvent::new(event_types::PUBLISH_FAILED)
                        .with_property(property_id)
                        .with_payload(serde_json::json!({
                            "error": source.to_string(),
                            "retryable": source.is_retryable(),
                        })),
                );
                return Err(WorkflowError::PublishFailure { source });
            }
        };

        let settled = {
            let mut state = self.inner.state.write().await;
            if state.store.property_id() != Some(property_id.as_str()) {
                tracing::warn!(job_id = %receipt.job_id, "Property changed during submission; job not tracked");
                Vec::new()
            } else {
                state.jobs.insert(
                    receipt.job_id.clone(),
                    TrackedJob {
                        drafts: accepted.iter().cloned().collect::<HashMap<_, _>>(),
                    },
                );
                let settled = apply_outcomes(&mut state, &receipt.job_id, &receipt.outcomes, false);
                let progress = progress_of(&state, &receipt.job_id, &submitted);
                report.published = progress.published;
                report.failed = progress.failed;
                report.pending = progress.pending;
                settled
            }
        };

        tracing::info!(
            batch_id = %batch_id,
            job_id = %receipt.job_id,
            message = %receipt.message,
            "Publish batch accepted",
        );
        self.emit(
            WorkflowEvent::new(event_types::PUBLISH_SUBMITTED)
                .with_property(property_id)
                .with_payload(serde_json::json!({
                    "job_id": receipt.job_id,
                    "drafts": submitted.len(),
                    "scheduled_at": scheduled_at.map(|at| at.to_rfc3339()),
                })),
        );
        self.emit_settled(settled);

        report.job_id = Some(receipt.job_id);
        report.message = receipt.message;
        Ok(report)
    }

    fn emit_settled(&self, settled: Vec<Settled>) {
        for Settled { key, error } in settled {
            let event = match error {
                None => WorkflowEvent::new(event_types::DRAFT_PUBLISHED),
                Some(error) => WorkflowEvent::new(event_types::DRAFT_PUBLISH_FAILED)
                    .with_payload(serde_json::json!({ "error": error })),
            };
            self.emit(event.with_draft(key));
        }
    }
}

/// Check that a draft may join a batch and move it to `publishing`.
fn admit(
    state: &mut SessionState,
    key: &DraftKey,
    scheduled_at: Option<Timestamp>,
    now: Timestamp,
) -> Result<DraftId, CoreError> {
    let draft = state
        .store
        .get(key)
        .ok_or_else(|| CoreError::draft_not_found(key))?;
    if draft.status != DraftStatus::Ready {
        return Err(CoreError::InvalidTransition {
            from: draft.status,
            action: DraftAction::MarkPublishing,
        });
    }
    enforce_channel_limits(draft)?;
    let id = draft
        .id
        .clone()
        .ok_or_else(|| CoreError::Validation(format!("Draft {key} has not been saved yet")))?;

    state.store.update(key, |d| d.mark_publishing(scheduled_at, now))?;
    Ok(id)
}

/// Apply per-draft results of a job. Results for drafts no longer
/// `publishing` are ignored. When `settled`, drafts without a result are
/// marked failed. A job with nothing left pending is forgotten.
fn apply_outcomes(
    state: &mut SessionState,
    job_id: &str,
    outcomes: &[DraftOutcome],
    settled: bool,
) -> Vec<Settled> {
    let Some(job) = state.jobs.get(job_id).cloned() else {
        return Vec::new();
    };
    let now = PublishingSession::now();
    let mut applied = Vec::new();

    for outcome in outcomes {
        let Some(key) = job.drafts.get(&outcome.draft_id) else {
            tracing::warn!(job_id, draft_id = %outcome.draft_id, "Result for a draft outside the job");
            continue;
        };
        if state.store.get(key).map(|d| d.status) != Some(DraftStatus::Publishing) {
            continue;
        }
        let (result, error) = match &outcome.result {
            OutcomeResult::Published { published_at } => {
                let at = *published_at;
                (state.store.update(key, |d| d.mark_published(at)), None)
            }
            OutcomeResult::Failed { error } => {
                let message = error.clone();
                (state.store.update(key, |d| d.mark_failed(message, now)), Some(error.clone()))
            }
        };
        match result {
            Ok(()) => applied.push(Settled { key: key.clone(), error }),
            Err(e) => tracing::warn!(job_id, draft = %key, error = %e, "Could not apply result"),
        }
    }

    if settled {
        for key in job.drafts.values() {
            if state.store.get(key).map(|d| d.status) == Some(DraftStatus::Publishing)
                && state.store.update(key, |d| d.mark_failed(MISSING_RESULT, now)).is_ok()
            {
                tracing::warn!(job_id, draft = %key, "Job settled without a result for draft");
                applied.push(Settled {
                    key: key.clone(),
                    error: Some(MISSING_RESULT.to_string()),
                });
            }
        }
    }

    let pending = job
        .drafts
        .values()
        .any(|key| state.store.get(key).map(|d| d.status) == Some(DraftStatus::Publishing));
    if !pending {
        state.jobs.remove(job_id);
    }
    applied
}

fn progress_of(state: &SessionState, job_id: &str, keys: &[DraftKey]) -> JobProgress {
    let mut progress = JobProgress {
        job_id: job_id.to_string(),
        published: Vec::new(),
        failed: Vec::new(),
        pending: Vec::new(),
    };
    for key in keys {
        match state.store.get(key).map(|d| d.status) {
            Some(DraftStatus::Published) => progress.published.push(key.clone()),
            Some(DraftStatus::Failed) => progress.failed.push(key.clone()),
            Some(DraftStatus::Publishing) => progress.pending.push(key.clone()),
            // Replaced or gone with a property change; nothing to wait for.
            _ => {}
        }
    }
    progress
}
