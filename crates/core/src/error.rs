use crate::draft_status::{DraftAction, DraftStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: cannot {action} a draft that is {from}")]
    InvalidTransition {
        from: DraftStatus,
        action: DraftAction,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a `NotFound` on a draft addressed by id or key.
    pub fn draft_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: "draft",
            key: key.to_string(),
        }
    }
}
