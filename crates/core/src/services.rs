//! Contracts for the external collaborators the workflow talks to.
//!
//! The workflow only sees these traits; `listcast-client` implements them
//! over HTTP and the workflow tests implement them in memory.

use async_trait::async_trait;

use crate::draft::{Draft, DraftContent, DraftPatch};
use crate::generation::{GeneratedDraft, GenerationRequest};
use crate::publishing::{JobReport, PublishReceipt, PublishRequest};

/// Failure of a single call to an external service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never got a response (connect, DNS, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-2xx status.
    #[error("Service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered 2xx with a body we could not interpret.
    #[error("Malformed service response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Whether a manual retry by the user has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// The AI content generation service.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate content for every channel in `request`. Atomic at the
    /// "all channels for one language" granularity.
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedDraft>, ServiceError>;

    /// Rewrite one draft following a free-form instruction.
    async fn improve_content(
        &self,
        draft: &Draft,
        instruction: &str,
    ) -> Result<DraftContent, ServiceError>;
}

/// Server-side draft storage.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Every persisted draft for a property, across all languages.
    async fn get_drafts(&self, property_id: &str) -> Result<Vec<Draft>, ServiceError>;

    async fn update_draft(&self, draft_id: &str, patch: &DraftPatch)
        -> Result<Draft, ServiceError>;
}

/// The batch publishing service.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_drafts(&self, request: &PublishRequest)
        -> Result<PublishReceipt, ServiceError>;

    async fn job_status(&self, job_id: &str) -> Result<JobReport, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_server_errors_are_retryable() {
        assert!(ServiceError::Network("timed out".into()).is_retryable());
        assert!(ServiceError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(ServiceError::Api {
            status: 429,
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!ServiceError::Api {
            status: 404,
            message: "no such property".into()
        }
        .is_retryable());
        assert!(!ServiceError::Decode("missing field".into()).is_retryable());
    }
}
