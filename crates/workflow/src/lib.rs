//! The listing publishing workflow.
//!
//! A [`PublishingSession`] takes one property from AI-generated drafts in
//! several languages and channels, through agent edits, to a published or
//! scheduled batch:
//!
//! - [`store`]: drafts keyed by (language, channel), one per key.
//! - [`selection`]: selected property, languages, channels and loading map.
//! - [`coordinator`]: per-language generation with request fencing.
//! - [`lifecycle`]: edits, readiness, AI improvement and auto-save.
//! - [`orchestrator`]: batch publish and schedule, job reconciliation.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod fence;
pub mod lifecycle;
pub mod orchestrator;
pub mod polling;
pub mod selection;
pub mod session;
pub mod store;

pub use config::WorkflowConfig;
pub use coordinator::GenerationOutcome;
pub use error::{WorkflowError, WorkflowResult};
pub use lifecycle::DraftUpdate;
pub use orchestrator::{BatchRejection, JobProgress, PublishReport};
pub use session::{LoadOutcome, PublishingSession, Services};
pub use store::{DraftRef, StatusSummary};
