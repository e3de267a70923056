//! Event-to-notification mapping.
//!
//! Every failure the workflow catches at a component boundary is emitted
//! as an event; [`Notification::from_event`] decides which events an agent
//! should see and how loudly. [`NotificationFeed`] runs that mapping over
//! a bus subscription.

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::bus::WorkflowEvent;
use crate::event_types as types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Offer a "retry" action. Retrying is always a manual user action.
    pub retryable: bool,
}

impl Notification {
    fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            retryable: false,
        }
    }

    fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Map an event to the notification an agent should see, if any.
    pub fn from_event(event: &WorkflowEvent) -> Option<Self> {
        let subject = event
            .draft
            .as_ref()
            .map(|key| format!("{} ({})", key.channel.label(), key.language))
            .unwrap_or_default();
        let error = event.payload_str("error").unwrap_or("Unknown error");
        let retryable = event
            .payload
            .get("retryable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let notification = match event.event_type.as_str() {
            types::PROPERTY_LOAD_FAILED => {
                Self::new(NotificationLevel::Error, "Could not load drafts", error)
                    .retryable(retryable)
            }
            types::GENERATION_COMPLETED => {
                let language = event.payload_str("language").unwrap_or("?");
                let unsaved: Vec<&str> = event
                    .payload
                    .get("unsaved")
                    .and_then(|v| v.as_array())
                    .map(|items| items.iter().filter_map(|c| c.as_str()).collect())
                    .unwrap_or_default();
                if unsaved.is_empty() {
                    Self::new(
                        NotificationLevel::Success,
                        "Content generated",
                        format!("New drafts are ready to review for '{language}'"),
                    )
                } else {
                    Self::new(
                        NotificationLevel::Warning,
                        "Content generated",
                        format!(
                            "Drafts for '{language}' on {} were not saved by the service and cannot be published",
                            unsaved.join(", ")
                        ),
                    )
                }
            }
            types::GENERATION_FAILED => {
                let language = event.payload_str("language").unwrap_or("?");
                Self::new(
                    NotificationLevel::Error,
                    format!("Generation failed for '{language}'"),
                    error,
                )
                .retryable(retryable)
            }
            types::DRAFT_UPDATED => {
                let warnings: Vec<&str> = event
                    .payload
                    .get("warnings")
                    .and_then(|v| v.as_array())
                    .map(|items| items.iter().filter_map(|w| w.as_str()).collect())
                    .unwrap_or_default();
                if warnings.is_empty() {
                    return None;
                }
                Self::new(
                    NotificationLevel::Warning,
                    format!("{subject} exceeds channel limits"),
                    warnings.join("; "),
                )
            }
            types::DRAFT_IMPROVE_FAILED => {
                Self::new(NotificationLevel::Error, format!("Could not improve {subject}"), error)
                    .retryable(retryable)
            }
            types::AUTOSAVE_FAILED => {
                Self::new(NotificationLevel::Warning, format!("{subject} not saved"), error)
                    .retryable(retryable)
            }
            types::PUBLISH_REJECTED => Self::new(
                NotificationLevel::Error,
                format!("{subject} left out of the batch"),
                error,
            ),
            types::PUBLISH_FAILED => {
                Self::new(NotificationLevel::Error, "Publishing failed", error)
                    .retryable(retryable)
            }
            types::PUBLISH_SUBMITTED => {
                let count = event.payload.get("drafts").and_then(|v| v.as_u64()).unwrap_or(0);
                let message = match event.payload_str("scheduled_at") {
                    Some(at) => format!("{count} drafts scheduled for {at}"),
                    None => format!("{count} drafts submitted for publishing"),
                };
                Self::new(NotificationLevel::Info, "Batch submitted", message)
            }
            types::DRAFT_PUBLISHED => Self::new(
                NotificationLevel::Success,
                "Published",
                format!("{subject} is live"),
            ),
            types::DRAFT_PUBLISH_FAILED => Self::new(
                NotificationLevel::Error,
                format!("{subject} failed to publish"),
                error,
            ),
            _ => return None,
        };

        Some(notification)
    }
}

/// Forwards the notifications derived from bus events to a channel.
pub struct NotificationFeed {
    sink: mpsc::UnboundedSender<Notification>,
}

impl NotificationFeed {
    pub fn new(sink: mpsc::UnboundedSender<Notification>) -> Self {
        Self { sink }
    }

    /// Run until the bus is dropped or the sink's receiver goes away.
    pub async fn run(self, mut receiver: broadcast::Receiver<WorkflowEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(notification) = Notification::from_event(&event) else {
                        continue;
                    };
                    if self.sink.send(notification).is_err() {
                        tracing::debug!("Notification receiver dropped, feed stopping");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification feed shutting down");
                    break;
                }
            }
        }
    }
}
