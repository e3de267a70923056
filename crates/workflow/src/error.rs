use listcast_core::error::CoreError;
use listcast_core::language::Language;
use listcast_core::services::ServiceError;

/// Error type for workflow operations.
///
/// Wraps [`CoreError`] for validation and state machine failures and adds
/// the failures that come from talking to external services.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Validation, invalid transition, not-found or conflict.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The operation needs a selected property.
    #[error("No property is selected")]
    NoPropertySelected,

    /// Regenerating would overwrite drafts the agent has worked on.
    #[error("{count} draft(s) for '{language}' have unsaved edits; confirm to regenerate")]
    PendingEdits { language: Language, count: usize },

    /// The content service failed for one language. Other languages and
    /// prior drafts for this language are untouched.
    #[error("Generation failed for '{language}': {source}")]
    GenerationFailure {
        language: Language,
        #[source]
        source: ServiceError,
    },

    /// The batch request itself failed; its drafts were marked failed.
    #[error("Publish batch failed: {source}")]
    PublishFailure {
        #[source]
        source: ServiceError,
    },

    /// Any other external call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Writing an export file failed.
    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}

impl WorkflowError {
    /// Whether a manual retry by the user has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationFailure { source, .. } | Self::PublishFailure { source } => {
                source.is_retryable()
            }
            Self::Service(source) => source.is_retryable(),
            _ => false,
        }
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::Core(CoreError::InvalidTransition { .. }))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Core(CoreError::Validation(_)))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
