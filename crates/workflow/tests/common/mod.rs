//! In-memory collaborators for workflow integration tests.
//!
//! [`FakeBackend`] implements all three service traits. Tests script its
//! behaviour (failures, per-draft results, body overrides) and hold calls
//! open with [`Notify`] gates to force out-of-order completion.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use listcast_core::channel::Channel;
use listcast_core::draft::{Draft, DraftContent, DraftKey, DraftPatch};
use listcast_core::generation::{GeneratedDraft, GenerationRequest};
use listcast_core::language::Language;
use listcast_core::publishing::{DraftOutcome, JobReport, PublishReceipt, PublishRequest};
use listcast_core::services::{ContentGenerator, DraftRepository, Publisher, ServiceError};
use listcast_events::{EventBus, WorkflowEvent};
use listcast_workflow::polling::PollConfig;
use listcast_workflow::{PublishingSession, Services, WorkflowConfig};
use tokio::sync::{broadcast, Notify};

pub const PROPERTY: &str = "prop-1";

pub fn lang(code: &str) -> Language {
    Language::parse(code).expect("valid language")
}

pub fn key(code: &str, channel: Channel) -> DraftKey {
    DraftKey::new(lang(code), channel)
}

pub fn test_config() -> WorkflowConfig {
    WorkflowConfig {
        agent_id: Some("agent-1".to_string()),
        poll: PollConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            multiplier: 2.0,
            max_attempts: 5,
        },
        ..WorkflowConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeBackend {
    // generation
    pub generate_calls: AtomicUsize,
    pub generation_requests: Mutex<Vec<GenerationRequest>>,
    generation_gates: Mutex<HashMap<Language, VecDeque<Arc<Notify>>>>,
    failing_languages: Mutex<HashSet<Language>>,
    body_overrides: Mutex<HashMap<DraftKey, String>>,
    extra_channels: Mutex<Vec<Channel>>,
    unsaved_channels: Mutex<HashSet<Channel>>,
    improve_gate: Mutex<Option<Arc<Notify>>>,
    improve_failure: Mutex<Option<ServiceError>>,
    pub improve_calls: AtomicUsize,

    // persistence
    persisted: Mutex<HashMap<String, Vec<Draft>>>,
    load_gate: Mutex<Option<Arc<Notify>>>,
    load_failure: Mutex<Option<ServiceError>>,
    pub load_calls: AtomicUsize,
    server_drafts: Mutex<HashMap<String, Draft>>,
    pub saves: Mutex<Vec<(String, DraftPatch)>>,
    save_gates: Mutex<HashMap<usize, Arc<Notify>>>,
    save_failures: Mutex<HashMap<usize, ServiceError>>,

    // publishing
    pub publish_requests: Mutex<Vec<PublishRequest>>,
    publish_failure: Mutex<Option<ServiceError>>,
    failing_drafts: Mutex<HashMap<String, String>>,
    defer_results: Mutex<bool>,
    job_reports: Mutex<VecDeque<Result<JobReport, ServiceError>>>,
    pub job_status_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold the next generation for `language` until the returned gate is
    /// notified.
    pub fn gate_generation(&self, language: &Language) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.generation_gates
            .lock()
            .unwrap()
            .entry(language.clone())
            .or_default()
            .push_back(gate.clone());
        gate
    }

    pub fn fail_generation(&self, language: &Language) {
        self.failing_languages.lock().unwrap().insert(language.clone());
    }

    pub fn heal_generation(&self, language: &Language) {
        self.failing_languages.lock().unwrap().remove(language);
    }

    pub fn override_body(&self, key: DraftKey, body: impl Into<String>) {
        self.body_overrides.lock().unwrap().insert(key, body.into());
    }

    /// Also return drafts for channels nobody asked for.
    pub fn return_extra_channel(&self, channel: Channel) {
        self.extra_channels.lock().unwrap().push(channel);
    }

    /// Return drafts for `channel` without a server id.
    pub fn withhold_id(&self, channel: Channel) {
        self.unsaved_channels.lock().unwrap().insert(channel);
    }

    pub fn gate_improve(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.improve_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_improve(&self, error: ServiceError) {
        *self.improve_failure.lock().unwrap() = Some(error);
    }

    pub fn persist(&self, property_id: &str, drafts: Vec<Draft>) {
        self.persisted
            .lock()
            .unwrap()
            .insert(property_id.to_string(), drafts);
    }

    pub fn gate_load(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.load_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_load(&self, error: ServiceError) {
        *self.load_failure.lock().unwrap() = Some(error);
    }

    /// Hold the `n`th auto-save (1-based) until the gate is notified.
    pub fn gate_save(&self, n: usize) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.save_gates.lock().unwrap().insert(n, gate.clone());
        gate
    }

    /// Make the `n`th auto-save (1-based) fail.
    pub fn fail_save(&self, n: usize, error: ServiceError) {
        self.save_failures.lock().unwrap().insert(n, error);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn fail_publish(&self, error: ServiceError) {
        *self.publish_failure.lock().unwrap() = Some(error);
    }

    /// Report `draft_id` as failed when it is published.
    pub fn reject_draft(&self, draft_id: &str, error: &str) {
        self.failing_drafts
            .lock()
            .unwrap()
            .insert(draft_id.to_string(), error.to_string());
    }

    /// Accept batches without inline results, as for scheduled jobs.
    pub fn defer_results(&self) {
        *self.defer_results.lock().unwrap() = true;
    }

    pub fn push_job_report(&self, report: Result<JobReport, ServiceError>) {
        self.job_reports.lock().unwrap().push_back(report);
    }

    pub fn last_publish_request(&self) -> Option<PublishRequest> {
        self.publish_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ContentGenerator for FakeBackend {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedDraft>, ServiceError> {
        let call = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.generation_requests.lock().unwrap().push(request.clone());

        let gate = self
            .generation_gates
            .lock()
            .unwrap()
            .get_mut(&request.language)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failing = self.failing_languages.lock().unwrap().contains(&request.language);
        if failing {
            return Err(ServiceError::Api {
                status: 503,
                message: "generator overloaded".to_string(),
            });
        }

        let overrides = self.body_overrides.lock().unwrap().clone();
        let mut channels = request.channels.clone();
        channels.extend(self.extra_channels.lock().unwrap().iter().copied());

        let mut drafts = Vec::new();
        for channel in channels {
            let key = DraftKey::new(request.language.clone(), channel);
            let id = format!("{}-{}-{call}", request.language, channel);
            let body = overrides
                .get(&key)
                .cloned()
                .unwrap_or_else(|| format!("{} copy for {channel}, call {call}", request.language));
            let content = DraftContent {
                title: format!("Sea-view villa ({})", request.language),
                body,
                hashtags: vec!["villa".to_string(), "#goa".to_string()],
                media_ids: vec!["m-1".to_string()],
                contact_included: true,
            };
            self.server_drafts.lock().unwrap().insert(
                id.clone(),
                Draft::generated(
                    request.property_id.clone(),
                    key,
                    Some(id.clone()),
                    content.clone(),
                    Utc::now(),
                ),
            );
            let unsaved = self.unsaved_channels.lock().unwrap().contains(&channel);
            drafts.push(GeneratedDraft {
                id: (!unsaved).then_some(id),
                channel,
                content,
            });
        }
        Ok(drafts)
    }

    async fn improve_content(
        &self,
        draft: &Draft,
        instruction: &str,
    ) -> Result<DraftContent, ServiceError> {
        self.improve_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.improve_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.improve_failure.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(DraftContent {
            title: draft.title.clone(),
            body: format!("{} [{instruction}]", draft.body),
            hashtags: draft.hashtags.clone(),
            media_ids: draft.media_ids.clone(),
            contact_included: draft.contact_included,
        })
    }
}

#[async_trait]
impl DraftRepository for FakeBackend {
    async fn get_drafts(&self, property_id: &str) -> Result<Vec<Draft>, ServiceError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.load_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.load_failure.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self
            .persisted
            .lock()
            .unwrap()
            .get(property_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_draft(&self, draft_id: &str, patch: &DraftPatch) -> Result<Draft, ServiceError> {
        let n = {
            let mut saves = self.saves.lock().unwrap();
            saves.push((draft_id.to_string(), patch.clone()));
            saves.len()
        };

        let gate = self.save_gates.lock().unwrap().remove(&n);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.save_failures.lock().unwrap().remove(&n);
        if let Some(error) = failure {
            return Err(error);
        }

        let mut drafts = self.server_drafts.lock().unwrap();
        let draft = drafts.get_mut(draft_id).ok_or_else(|| ServiceError::Api {
            status: 404,
            message: format!("Draft {draft_id} not found"),
        })?;
        draft
            .apply_patch(patch, None, Utc::now())
            .map_err(|e| ServiceError::Api {
                status: 409,
                message: e.to_string(),
            })?;
        Ok(draft.clone())
    }
}

#[async_trait]
impl Publisher for FakeBackend {
    async fn publish_drafts(&self, request: &PublishRequest) -> Result<PublishReceipt, ServiceError> {
        self.publish_requests.lock().unwrap().push(request.clone());
        let failure = self.publish_failure.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let job_id = format!("job-{}", self.publish_requests.lock().unwrap().len());
        let deferred = request.schedule_at.is_some() || *self.defer_results.lock().unwrap();
        let outcomes = if deferred {
            Vec::new()
        } else {
            self.outcomes_for(&request.draft_ids)
        };
        Ok(PublishReceipt {
            job_id,
            message: format!("{} drafts accepted", request.draft_ids.len()),
            outcomes,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobReport, ServiceError> {
        self.job_status_calls.fetch_add(1, Ordering::SeqCst);
        self.job_reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(JobReport {
                    job_id: job_id.to_string(),
                    settled: false,
                    outcomes: Vec::new(),
                })
            })
    }
}

impl FakeBackend {
    /// The results the service would report for `draft_ids`.
    pub fn outcomes_for(&self, draft_ids: &[String]) -> Vec<DraftOutcome> {
        let failing = self.failing_drafts.lock().unwrap();
        draft_ids
            .iter()
            .map(|id| match failing.get(id) {
                Some(error) => DraftOutcome::failed(id.clone(), error.clone()),
                None => DraftOutcome::published(id.clone(), Utc::now()),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

pub struct Harness {
    pub session: PublishingSession,
    pub backend: Arc<FakeBackend>,
    pub events: broadcast::Receiver<WorkflowEvent>,
}

impl Harness {
    /// Drain every event published so far.
    pub fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn event_types(&mut self) -> Vec<String> {
        self.drain_events().into_iter().map(|e| e.event_type).collect()
    }
}

pub fn harness() -> Harness {
    let backend = FakeBackend::new();
    let bus = Arc::new(EventBus::new(1024));
    let events = bus.subscribe();
    let session = PublishingSession::new(Services::shared(backend.clone()), bus, test_config());
    Harness {
        session,
        backend,
        events,
    }
}

/// A harness with `PROPERTY` selected and `channels` chosen.
pub async fn harness_with(channels: &[Channel]) -> Harness {
    let h = harness();
    h.session.select_property(PROPERTY).await.expect("select property");
    h.session.set_channels(channels.iter().copied()).await;
    h
}

/// Generate `languages` and mark every resulting draft ready.
pub async fn ready_drafts(h: &Harness, languages: &[&str]) {
    for code in languages {
        h.session
            .add_language(lang(code))
            .await
            .expect("generation should succeed");
    }
    h.session.mark_all_ready().await;
}

/// Yield until `condition` holds, failing the test after a while.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub fn long_body(chars: usize) -> String {
    "a".repeat(chars)
}
